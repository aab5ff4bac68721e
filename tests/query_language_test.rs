// Query language over several joined tables
use cargoql::core::QueryError;
use cargoql::{CargoDatabase, CargoError, PageIdentity, QueryText, Settings, StoreContext, Value};

fn library() -> CargoDatabase {
    let mut db = CargoDatabase::open_in_memory(Settings::default()).unwrap();
    db.declare(
        1,
        "_table=Books|Year=Integer|Published=Date\
         |Category=String (hierarchy;allowed values=*Fiction\n**Fantasy\n*Nonfiction)",
    )
    .unwrap();
    db.declare(2, "_table=Reviews|_parentTables=Books(_localField=Book)|Book=Page|Stars=Integer")
        .unwrap();

    let ctx = StoreContext::page_save();
    for (id, page, year, published, category) in [
        (1, "Dragons", "1999", "1999-04-12", "Fantasy"),
        (2, "Atlas", "2005", "2005", "Nonfiction"),
        (3, "Novel", "2005", "March 2005", "Fiction"),
    ] {
        db.store(
            &ctx,
            &PageIdentity::main(id, page),
            "Books",
            [("Year", year), ("Published", published), ("Category", category)],
        )
        .unwrap();
    }
    for (id, page, book, stars) in [(10, "Review 1", "Dragons", "5"), (11, "Review 2", "Atlas", "2"), (12, "Review 3", "Dragons", "3")] {
        db.store(&ctx, &PageIdentity::main(id, page), "Reviews", [("Book", book), ("Stars", stars)])
            .unwrap();
    }
    db
}

#[test]
fn test_within_includes_descendants() {
    let db = library();
    let rows = db
        .query(&QueryText::new("Books", "_pageName").where_clause("Category WITHIN 'Fiction'"))
        .unwrap();
    assert_eq!(rows.page_names(), vec!["Dragons", "Novel"]);
}

#[test]
fn test_parent_tables_join_implicitly() {
    let db = library();
    let rows = db
        .query(
            &QueryText::new("Reviews=R, Books=B", "R._pageName=Review, B.Year=Year")
                .where_clause("R.Stars >= 3")
                .order_by("R._pageName"),
        )
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.value(0, "Review"), Some(&Value::Text("Review 1".to_string())));
    assert_eq!(rows.value(1, "Year"), Some(&Value::Integer(1999)));
}

#[test]
fn test_group_by_with_having() {
    let db = library();
    let rows = db
        .query(
            &QueryText::new("Reviews", "Book, COUNT(*)=Reviews, MAX(Stars)=Best")
                .group_by("Book")
                .having("COUNT(*) > 1"),
        )
        .unwrap();
    assert!(rows.is_aggregating);
    assert_eq!(rows.rows, vec![vec![
        Value::Text("Dragons".to_string()),
        Value::Integer(2),
        Value::Integer(5),
    ]]);
}

#[test]
fn test_date_functions_and_precision() {
    let db = library();
    let rows = db
        .query(
            &QueryText::new("Books", "_pageName, Published")
                .where_clause("YEAR(Published) = 2005")
                .order_by("_pageName"),
        )
        .unwrap();
    assert_eq!(rows.page_names(), vec!["Atlas", "Novel"]);
    assert!(rows.columns.contains(&"Published__precision".to_string()));
}

#[test]
fn test_limit_and_offset() {
    let db = library();
    let first = db.query(&QueryText::new("Books", "_pageName").limit("1")).unwrap();
    assert_eq!(first.page_names(), vec!["Dragons"]);
    assert!(first.possibly_more());

    let rest = db.query(&QueryText::new("Books", "_pageName").offset("1")).unwrap();
    assert_eq!(rest.page_names(), vec!["Atlas", "Novel"]);

    assert!(matches!(
        db.query(&QueryText::new("Books", "_pageName").limit("ten")),
        Err(CargoError::Query(QueryError::InvalidLimit { .. }))
    ));
}

#[test]
fn test_disallowed_function() {
    let db = library();
    assert!(matches!(
        db.query(&QueryText::new("Books", "LOAD_EXTENSION('x')")),
        Err(CargoError::Query(QueryError::DisallowedFunction(_)))
    ));
}

#[test]
fn test_unknown_clause_names() {
    let mut text = QueryText::default();
    assert!(text.set_clause("order_by", "Year DESC"));
    assert!(text.set_clause("Join On", "A.x = B.y"));
    assert!(!text.set_clause("sort", "Year"));
    assert_eq!(text.order_by, "Year DESC");
    assert_eq!(text.join_on, "A.x = B.y");
}
