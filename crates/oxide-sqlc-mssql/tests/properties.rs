//! Row limit and value conversion properties.

mod common;

use common::*;
use oxide_sqlc_core::ast::select;
use oxide_sqlc_core::value::SqlValue;
use oxide_sqlc_mssql::types::blob_to_hex;
use proptest::prelude::*;

proptest! {
    #[test]
    fn limit_is_always_top(limit in 1u64..100_000) {
        let t = t();
        let query = select(vec![t.c("x")]).from(&t).order_by(t.c("x")).limit(limit);
        let expected = format!("SELECT TOP {limit} t.x FROM t ORDER BY t.x");
        prop_assert_eq!(sql(query.clone(), &mssql()), expected.clone());
        prop_assert_eq!(sql(query, &windowed()), expected);
    }

    #[test]
    fn row_number_bounds_cover_the_page(limit in 1u64..10_000, offset in 1u64..10_000) {
        let t = t();
        let query = select(vec![t.c("x")])
            .from(&t)
            .order_by(t.c("x"))
            .limit(limit)
            .offset(offset);
        let sql = sql(query, &windowed());
        let expected = format!("WHERE rn > {offset} AND rn <= {}", offset + limit);
        prop_assert!(sql.ends_with(&expected), "{}", sql);
        prop_assert!(!sql.contains("TOP"));
    }

    #[test]
    fn distinct_rows_are_numbered_after_deduplication(limit in 1u64..10_000, offset in 1u64..10_000) {
        let t = t();
        let query = select(vec![t.c("y")])
            .from(&t)
            .distinct()
            .order_by(t.c("y"))
            .limit(limit)
            .offset(offset);
        let sql = sql(query, &windowed());
        let distinct_at = sql.find("SELECT DISTINCT").unwrap();
        let row_number_at = sql.find("ROW_NUMBER()").unwrap();
        prop_assert!(row_number_at < distinct_at, "{}", sql);
        prop_assert!(!sql[distinct_at..].contains("ROW_NUMBER"), "{}", sql);
        let expected = format!("WHERE rn > {offset} AND rn <= {}", offset + limit);
        prop_assert!(sql.ends_with(&expected), "{}", sql);
    }

    #[test]
    fn hex_binds_are_reversible(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let SqlValue::Text(hex) = blob_to_hex(SqlValue::Blob(bytes.clone())).unwrap() else {
            panic!("expected text");
        };
        prop_assert_eq!(hex.len(), bytes.len() * 2);
        let decoded: Vec<u8> = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect();
        prop_assert_eq!(decoded, bytes);
    }
}
