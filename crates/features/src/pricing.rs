use shelfwise_model::PriceBucket;

/// Price boundaries for one family of goods.
///
/// Prices below `low_below` are low, above `high_above` high, anything in
/// between (inclusive) mid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceTable {
    pub low_below: f64,
    pub high_above: f64,
}

/// Small devices such as watches and bands.
pub const WEARABLE_PRICES: PriceTable = PriceTable {
    low_below: 1000.0,
    high_above: 3000.0,
};

/// Everything else.
pub const GENERAL_PRICES: PriceTable = PriceTable {
    low_below: 3000.0,
    high_above: 8000.0,
};

// Heuristic boundaries; new families should get an explicit table here.
const WEARABLE_CATEGORIES: [&str; 6] = [
    "wearable",
    "smartwatch",
    "watch",
    "band",
    "智能手表",
    "智能手环",
];

impl PriceTable {
    pub fn bucket(&self, price: f64) -> PriceBucket {
        if price < self.low_below {
            PriceBucket::Low
        } else if price > self.high_above {
            PriceBucket::High
        } else {
            PriceBucket::Mid
        }
    }
}

/// Bucket `price` according to `table`.
pub fn price_bucket(price: f64, table: &PriceTable) -> PriceBucket {
    table.bucket(price)
}

pub fn is_wearable(category: &str) -> bool {
    let category = category.trim().to_lowercase();
    WEARABLE_CATEGORIES.contains(&category.as_str())
}

/// Pick the table implied by an intent's preferred categories: the
/// wearable table when any of them is a wearable, the general one otherwise.
pub fn price_table_for(categories: &[String]) -> &'static PriceTable {
    if categories.iter().any(|c| is_wearable(c)) {
        &WEARABLE_PRICES
    } else {
        &GENERAL_PRICES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_buckets() {
        assert_eq!(GENERAL_PRICES.bucket(2999.0), PriceBucket::Low);
        assert_eq!(GENERAL_PRICES.bucket(3000.0), PriceBucket::Mid);
        assert_eq!(GENERAL_PRICES.bucket(8000.0), PriceBucket::Mid);
        assert_eq!(GENERAL_PRICES.bucket(8000.01), PriceBucket::High);
    }

    #[test]
    fn test_wearable_buckets() {
        assert_eq!(WEARABLE_PRICES.bucket(999.0), PriceBucket::Low);
        assert_eq!(WEARABLE_PRICES.bucket(2499.0), PriceBucket::Mid);
        assert_eq!(WEARABLE_PRICES.bucket(3299.0), PriceBucket::High);
    }

    #[test]
    fn test_table_selection() {
        assert_eq!(price_table_for(&["laptop".into()]), &GENERAL_PRICES);
        assert_eq!(
            price_table_for(&["phone".into(), "Wearable".into()]),
            &WEARABLE_PRICES
        );
        assert_eq!(price_table_for(&[]), &GENERAL_PRICES);
    }
}
