use chrono::Utc;
use rand::Rng;

/// Generates a globally-unique order code for a new donation.
///
/// Millisecond timestamp plus a random suffix so that two intents created in
/// the same clock tick still get distinct codes.
pub fn generate_order_code() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..0x1_0000);
    format!("ORDER-{}-{:04x}", millis, suffix)
}

/// Generates a withdrawal code for an NGO fund-claim ledger row.
pub fn generate_withdraw_code() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix: u32 = rand::rng().random_range(0..0x1_0000);
    format!("WD-{}-{:04x}", millis, suffix)
}

/// Generates a fresh lowercase hex wallet address for donor/volunteer
/// registration. Custody of the matching key lives with the minting service;
/// the backend only ever stores the address.
pub fn generate_wallet_address() -> String {
    let mut bytes = [0u8; 20];
    rand::rng().fill(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("0x{}", hex)
}

/// URL-friendly slug from a project title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_codes_are_unique_in_a_burst() {
        let codes: std::collections::HashSet<String> =
            (0..256).map(|_| generate_order_code()).collect();
        assert_eq!(codes.len(), 256);
    }

    #[test]
    fn wallet_address_is_lowercase_hex() {
        let addr = generate_wallet_address();
        assert_eq!(addr.len(), 42);
        assert!(addr.starts_with("0x"));
        assert!(addr[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Air Bersih untuk Desa"), "air-bersih-untuk-desa");
        assert_eq!(slugify("  Reboisasi -- Hutan! "), "reboisasi-hutan");
    }
}
