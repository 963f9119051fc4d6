use rust_decimal::Decimal;

use crate::DbPool;

/// The boutique's starter catalog, priced in dollars and cents.
///
/// `get-product-price` answers from these rows, so the names here must
/// match what the store documents talk about.
const CATALOG: &[(&str, &str, i64)] = &[
    ("Finch Seed", "Premium small-seed blend for finches and canaries", 12_99),
    ("Canary Song Mix", "Vitamin-fortified mix that supports singing condition", 14_49),
    ("Budgie Millet Spray", "Natural millet sprays, bundle of six", 7_25),
    ("Premium Parrot Pellets", "Complete daily diet for medium and large parrots", 24_99),
    ("Cuttlebone 2-Pack", "Calcium supplement with cage clips", 4_50),
    ("Cedar Perch Swing", "Hand-finished cedar swing for small birds", 11_75),
    ("Stainless Feeder Cup", "Dishwasher-safe clip-on feeder cup", 6_99),
    ("Heated Bird Bath", "Thermostatic bath for aviary use in cold weather", 49_99),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductRow {
    pub name: String,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub products_seeded: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub product_count: i64,
    pub products: Vec<ProductRow>,
    pub missing: Vec<&'static str>,
}

impl VerificationResult {
    pub fn all_present(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Idempotent catalog load plus a read-back verification pass.
pub struct BoutiqueSeed;

impl BoutiqueSeed {
    pub async fn load(pool: &DbPool) -> Result<SeedResult, sqlx::Error> {
        for (name, description, price_cents) in CATALOG {
            sqlx::query(
                "INSERT INTO products (product_name, description, price) \
                 VALUES (?, ?, ?) \
                 ON DUPLICATE KEY UPDATE description = VALUES(description), price = VALUES(price)",
            )
            .bind(name)
            .bind(description)
            .bind(Decimal::new(*price_cents, 2))
            .execute(pool)
            .await?;
        }

        Ok(SeedResult { products_seeded: CATALOG.len() })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, sqlx::Error> {
        let rows: Vec<(String, Decimal)> =
            sqlx::query_as("SELECT product_name, price FROM products ORDER BY product_name")
                .fetch_all(pool)
                .await?;

        let products: Vec<ProductRow> =
            rows.into_iter().map(|(name, price)| ProductRow { name, price }).collect();

        let missing = CATALOG
            .iter()
            .map(|(name, _, _)| *name)
            .filter(|name| !products.iter().any(|product| product.name == *name))
            .collect();

        Ok(VerificationResult { product_count: products.len() as i64, products, missing })
    }

    /// Human-readable verification summary for the seed command.
    pub fn describe(verification: &VerificationResult) -> String {
        if verification.all_present() {
            let listing: Vec<String> = verification
                .products
                .iter()
                .map(|product| format!("  - {}: ${}", product.name, product.price))
                .collect();
            format!(
                "Database setup complete. Found {} products:\n{}",
                verification.product_count,
                listing.join("\n")
            )
        } else {
            format!("Seed verification failed; missing products: {}", verification.missing.join(", "))
        }
    }
}
