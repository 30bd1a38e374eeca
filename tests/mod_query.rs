use bson::{Bson, Document, bson, doc};
use memquery::query::path::resolve;
use memquery::{DbError, Operand, Query, QueryEngine, WhereFn};

fn fixture() -> QueryEngine {
    QueryEngine::new(vec![
        doc! {"a": 5, "b": 5, "c": null},
        doc! {"a": 3, "b": null, "c": 8},
        doc! {"a": null, "b": 3, "c": 9},
        doc! {"a": 1, "b": 2, "c": 3},
        doc! {"a": 2, "c": 5},
        doc! {"a": 3, "b": 2},
        doc! {"a": 4},
        doc! {"b": 2, "c": 4},
        doc! {"b": 2},
        doc! {"c": 6},
        doc! {"a": {"b": {"c": 42, "d": 12}}},
        doc! {"a": {"b": {"d": 100}}},
    ])
}

fn count(engine: &QueryEngine, query: Document) -> usize {
    engine.find(&Query::from(query)).unwrap().len()
}

#[test]
fn simple_key_equality() {
    let engine = fixture();
    let result = engine.find(&Query::from(doc! {"a": 5})).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].get_i32("a").unwrap(), 5);
}

#[test]
fn exists_partitions_simple_keys() {
    let engine = fixture();
    assert_eq!(count(&engine, doc! {"c": {"$exists": true}}), 7);
    assert_eq!(count(&engine, doc! {"c": {"$exists": false}}), 5);
}

#[test]
fn or_and_on_simple_keys() {
    let engine = fixture();
    assert_eq!(count(&engine, doc! {"$or": [{"a": 3}, {"b": 2}]}), 5);
    assert_eq!(count(&engine, doc! {"$and": [{"a": 3}, {"b": 2}]}), 1);
}

#[test]
fn dotted_paths() {
    let engine = fixture();
    assert_eq!(count(&engine, doc! {"a.b.c": 42}), 1);
    assert_eq!(count(&engine, doc! {"a.b.c": {"$exists": true}}), 1);
    assert_eq!(count(&engine, doc! {"a.b.d": {"$exists": true}}), 2);
    assert_eq!(count(&engine, doc! {"a.b": {"$exists": false}}), 10);
    assert_eq!(count(&engine, doc! {"$or": [{"a.b.c": 42}, {"a.b.d": 100}]}), 2);
    assert_eq!(count(&engine, doc! {"$and": [{"a.b.c": 42}, {"a.b.d": 12}]}), 1);
}

#[test]
fn resolve_nested_without_error() {
    let d = doc! {"a": {"b": {"c": 42}}};
    assert_eq!(resolve(&d, "a.b.c").unwrap(), Some(&Bson::Int32(42)));
    assert_eq!(resolve(&d, "a.b.x").unwrap(), None);
}

#[test]
fn empty_query_returns_whole_collection_in_order() {
    let engine = fixture();
    let all = engine.find(&Query::new()).unwrap();
    assert_eq!(all.len(), engine.len());
    for (hit, rec) in all.iter().zip(engine.records()) {
        assert!(std::ptr::eq(*hit, rec));
    }
}

#[test]
fn or_returns_matches_in_collection_order() {
    let engine = QueryEngine::new(vec![doc! {"a": 5, "b": 5}, doc! {"a": 3, "b": 2}, doc! {"a": 4}]);
    let hits = engine.find(&Query::from(doc! {"$or": [{"b": 2}, {"a": 3}]})).unwrap();
    assert_eq!(hits, vec![&doc! {"a": 3, "b": 2}]);
    let hits = engine.find(&Query::from(doc! {"$or": [{"a": 4}, {"a": 5}]})).unwrap();
    assert_eq!(hits, vec![&doc! {"a": 5, "b": 5}, &doc! {"a": 4}]);
}

// A nested predicate under a plain field decides the whole level: entries
// after it are never evaluated.
#[test]
fn nested_predicate_short_circuits_later_siblings() {
    let engine = QueryEngine::new(vec![doc! {"a": 1, "b": 1}]);
    assert_eq!(count(&engine, doc! {"a": {"$exists": true}, "b": 999}), 1);
    // Entries before the nested predicate still apply.
    assert_eq!(count(&engine, doc! {"b": 999, "a": {"$exists": true}}), 0);
    // The sibling is skipped even when it would have raised an error.
    assert_eq!(count(&engine, doc! {"a": {"$exists": true}, "$exists": "bogus"}), 1);
}

#[test]
fn nested_plain_keys_resolve_from_the_root() {
    let engine = QueryEngine::new(vec![doc! {"a": {"b": 1}, "b": 2}]);
    assert_eq!(count(&engine, doc! {"a": {"b": 2}}), 1);
    assert_eq!(count(&engine, doc! {"a": {"b": 1}}), 0);
}

#[test]
fn not_negates_scoped_predicate() {
    let engine = fixture();
    assert_eq!(count(&engine, doc! {"c": {"$not": {"$exists": true}}}), 5);
    assert_eq!(count(&engine, doc! {"$not": {"a": 3}}), 10);
}

#[test]
fn comparison_operators_skip_null_and_absent() {
    let engine = fixture();
    assert_eq!(count(&engine, doc! {"a": {"$gt": 3}}), 2);
    assert_eq!(count(&engine, doc! {"a": {"$gte": 3}}), 4);
    assert_eq!(count(&engine, doc! {"a": {"$lt": 2}}), 1);
    assert_eq!(count(&engine, doc! {"c": {"$lte": 4}}), 2);
    assert_eq!(count(&engine, doc! {"a": {"$ne": 3}}), 10);
}

#[test]
fn in_and_nin_on_lists() {
    let engine = QueryEngine::new(vec![doc! {"lists": ["bar", "baz"]}]);
    assert_eq!(count(&engine, doc! {"lists": {"$in": ["foo", "bar"]}}), 1);
    assert_eq!(count(&engine, doc! {"lists": {"$nin": ["foo", "bar"]}}), 0);
    assert_eq!(count(&engine, doc! {"lists": {"$nin": ["foo"]}}), 1);
}

#[test]
fn in_with_regex_operand() {
    let engine = QueryEngine::new(vec![doc! {"tags": ["alpha", "Beta"]}, doc! {"tags": [1, 2]}]);
    let hits = engine
        .find_json(r#"{"tags": {"$in": [{"$regularExpression": {"pattern": "^be", "options": "i"}}]}}"#)
        .unwrap();
    assert_eq!(hits.len(), 1);
    let hits = engine
        .find_json(r#"{"tags": {"$nin": [{"$regularExpression": {"pattern": "^be", "options": ""}}]}}"#)
        .unwrap();
    assert_eq!(hits.len(), 2);
}

#[test]
fn invalid_regex_is_query_error() {
    let engine = QueryEngine::new(vec![doc! {"tags": ["x"]}]);
    let err = engine
        .find_json(r#"{"tags": {"$in": [{"$regularExpression": {"pattern": "(", "options": ""}}]}}"#)
        .unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
}

#[test]
fn where_function_sees_whole_record() {
    let engine = fixture();
    let q = Query::new().with(
        "$where",
        WhereFn::new(|d: &Document| d.get_i32("a").is_ok_and(|a| a > 2)),
    );
    assert_eq!(engine.find(&q).unwrap().len(), 4);
}

#[test]
fn where_inside_or_clause() {
    let engine = fixture();
    let q = Query::new().with(
        "$or",
        vec![
            Query::new().with("a", bson!(1)),
            Query::new().with("$where", WhereFn::new(|d: &Document| d.is_empty())),
        ],
    );
    assert_eq!(engine.find(&q).unwrap().len(), 1);
}

#[test]
fn custom_operator_extends_registry() {
    let engine = QueryEngine::builder()
        .records(vec![doc! {"l": [1, 2]}, doc! {"l": [1]}, doc! {"l": 3}])
        .query_fn("$size", |_, record, operand, key| {
            let path = key.ok_or_else(|| DbError::InvalidPath("$size needs a field".into()))?;
            let Operand::Value(Bson::Int32(want)) = operand else {
                return Err(DbError::TypeMismatch("$size expects an int".into()));
            };
            Ok(matches!(resolve(record, path)?, Some(Bson::Array(items)) if items.len() as i64 == i64::from(*want)))
        })
        .build();
    assert_eq!(count(&engine, doc! {"l": {"$size": 2}}), 1);
    assert_eq!(count(&engine, doc! {"l": {"$size": 1}}), 1);
}

#[test]
fn custom_operator_can_recurse_through_matcher() {
    let engine = QueryEngine::builder()
        .records(vec![doc! {"a": 1}, doc! {"a": 2}, doc! {"a": 3}])
        .query_fn("$nor", |matcher, record, operand, key| {
            let clauses = operand
                .as_list()
                .ok_or_else(|| DbError::TypeMismatch("$nor expects a list".into()))?;
            for clause in clauses {
                let q = clause
                    .as_query()
                    .ok_or_else(|| DbError::TypeMismatch("$nor clauses must be predicates".into()))?;
                if matcher.matches(record, q, key)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
        .build();
    assert_eq!(count(&engine, doc! {"$nor": [{"a": 1}, {"a": 3}]}), 1);
}

#[test]
fn override_shadows_builtin() {
    let engine = QueryEngine::builder()
        .records(vec![doc! {"a": 1}, doc! {}])
        .query_fn("$exists", |_, _, _, _| Ok(true))
        .build();
    assert_eq!(count(&engine, doc! {"a": {"$exists": false}}), 2);
}

#[test]
fn operator_without_field_fails_the_scan() {
    let engine = fixture();
    let err = engine.find(&Query::from(doc! {"$gt": 1})).unwrap_err();
    assert!(matches!(err, DbError::InvalidPath(_)));
}

#[test]
fn find_one_returns_first_or_none() {
    let engine = fixture();
    let first = engine.find_one(&Query::from(doc! {"b": 2})).unwrap();
    assert_eq!(first, Some(&doc! {"a": 1, "b": 2, "c": 3}));
    assert_eq!(engine.find_one(&Query::from(doc! {"zzz": 1})).unwrap(), None);
}
