//! Run id generation.

use sha2::{Digest, Sha256};

use crate::models::ProductRecord;
use crate::patterns::PatternDefinition;

const FIELD_SEP: &[u8] = b"\x1f";
const RECORD_SEP: &[u8] = b"\n";

/// Compute a run id from the input tables and the run's creation time.
///
/// Identical inputs started at different times get different ids.
pub fn compute_run_id(products: &[ProductRecord], patterns: &[PatternDefinition], created_at: &str) -> String {
    let mut hasher = Sha256::new();

    for p in products {
        for field in [
            &p.group,
            &p.bank_abb,
            &p.bank_name,
            &p.fi_type,
            &p.product_type,
            &p.product_name,
            &p.url,
            &p.status,
        ] {
            hasher.update(field.as_bytes());
            hasher.update(FIELD_SEP);
        }
        hasher.update(RECORD_SEP);
    }
    hasher.update(RECORD_SEP);

    for d in patterns {
        for field in [&d.set, &d.topic, &d.pattern] {
            hasher.update(field.as_bytes());
            hasher.update(FIELD_SEP);
        }
        hasher.update(RECORD_SEP);
    }
    hasher.update(RECORD_SEP);

    hasher.update(created_at.as_bytes());
    hex::encode(hasher.finalize())
}
