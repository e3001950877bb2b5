//! Binding records, bags and row collections.

mod common;
use common::*;

use std::collections::HashMap;

use oxide_bind::bind::rows;
use oxide_bind::{render, Dialect, Error, Input, Limits, Params, Row, SqlValue};
use oxide_bind_derive::Record;

fn sqlite(template: &str, inputs: &[Input<'_>]) -> oxide_bind::Result<oxide_bind::Statement> {
    render(Dialect::Sqlite, template, inputs, Limits::for_dialect(Dialect::Sqlite))
}

#[test]
fn insert_rows_from_records() {
    let users = vec![user(1, "A"), user(2, "B")];
    let stmt = sqlite(
        "INSERT INTO u(id,name) VALUES :rows{id,name}",
        &[Input::from(rows(&users))],
    )
    .unwrap();
    assert_eq!(stmt.sql, "INSERT INTO u(id,name) VALUES (?,?),(?,?)");
    assert_eq!(
        stmt.args,
        [SqlValue::Int(1), text("A"), SqlValue::Int(2), text("B")]
    );
}

#[test]
fn record_fields_bind_by_column_name() {
    let mut u = user(7, "Ann");
    u.address = Some(Address {
        street: String::from("Main"),
        city: None,
    });
    u.tags = vec![String::from("a"), String::from("b")];
    let stmt = sqlite(
        "UPDATE u SET name=:name, street=:street, city=:city, tags=:tags WHERE id=:id",
        &[Input::from(&u)],
    )
    .unwrap();
    assert_eq!(stmt.sql, "UPDATE u SET name=?, street=?, city=?, tags=? WHERE id=?");
    assert_eq!(stmt.args[0], text("Ann"));
    assert_eq!(stmt.args[1], text("Main"));
    assert_eq!(stmt.args[2], SqlValue::Null);
    // Scalar field: the whole list is one argument.
    assert_eq!(
        stmt.args[3],
        SqlValue::Array(vec![text("a"), text("b")])
    );
    assert_eq!(stmt.args[4], SqlValue::Int(7));
}

#[test]
fn absent_nested_record_binds_null() {
    let u = user(1, "A");
    let stmt = sqlite("SELECT :street, :city", &[Input::from(&u)]).unwrap();
    assert_eq!(stmt.args, [SqlValue::Null, SqlValue::Null]);
}

#[test]
fn later_inputs_override_earlier() {
    let u = user(1, "A");
    let stmt = sqlite(
        "SELECT :id, :name",
        &[
            Input::from(&u),
            Input::from(Params::new().with("name", "override")),
        ],
    )
    .unwrap();
    assert_eq!(stmt.args, [SqlValue::Int(1), text("override")]);
}

#[derive(Debug, Default, Record)]
pub struct Home {
    pub street: String,
}

#[derive(Debug, Default, Record)]
pub struct Work {
    pub street: String,
}

#[derive(Debug, Default, Record)]
pub struct Contact {
    pub id: i64,
    pub home: Home,
    pub work: Option<Work>,
}

#[test]
fn ambiguous_field_is_rejected() {
    let c = Contact::default();
    let result = sqlite("SELECT :street", &[Input::from(&c)]);
    assert!(matches!(
        result,
        Err(Error::FieldAmbiguous { name, row: None }) if name == "street"
    ));
    // Unambiguous names on the same record still bind.
    assert!(sqlite("SELECT :id", &[Input::from(&c)]).is_ok());
}

#[test]
fn ambiguous_row_column_reports_row() {
    let contacts = [Contact::default()];
    let result = sqlite("VALUES :rows{id,street}", &[Input::from(rows(&contacts))]);
    assert!(matches!(
        result,
        Err(Error::FieldAmbiguous { name, row: Some(0) }) if name == "street"
    ));
}

#[test]
fn map_rows_bind_by_key() {
    let rows = vec![
        Row::from(HashMap::from([
            (String::from("a"), SqlValue::Int(1)),
            (String::from("b"), text("x")),
        ])),
        Row::from(HashMap::from([
            (String::from("a"), SqlValue::Int(2)),
            (String::from("b"), text("y")),
        ])),
    ];
    let stmt = render(
        Dialect::Postgres,
        "INSERT INTO t(b,a) VALUES :items{b,a}",
        &[Input::from(Params::new().with_rows("items", rows))],
        Limits::unlimited(),
    )
    .unwrap();
    assert_eq!(stmt.sql, "INSERT INTO t(b,a) VALUES ($1,$2),($3,$4)");
    assert_eq!(
        stmt.args,
        [text("x"), SqlValue::Int(1), text("y"), SqlValue::Int(2)]
    );
}

#[test]
fn missing_row_column_reports_row_index() {
    let good = HashMap::from([
        (String::from("a"), SqlValue::Int(1)),
        (String::from("b"), SqlValue::Int(2)),
    ]);
    let bad = HashMap::from([(String::from("a"), SqlValue::Int(3))]);
    let result = sqlite(
        "VALUES :rows{a,b}",
        &[Input::from(vec![Row::from(good), Row::from(bad)])],
    );
    assert!(matches!(
        result,
        Err(Error::ColumnNotFound { column, name, row: 1 }) if column == "b" && name == "rows"
    ));
}

#[test]
fn bare_rows_only_answer_to_rows() {
    let users = vec![user(1, "A")];
    let result = sqlite("VALUES :items{id}", &[Input::from(rows(&users))]);
    assert!(matches!(result, Err(Error::ParamMissing(name)) if name == "items"));
}

#[test]
fn malformed_row_blocks() {
    let users = vec![user(1, "A")];
    for template in ["VALUES :rows{}", "VALUES :rows{id", "VALUES :rows{id,,name}"] {
        let result = sqlite(template, &[Input::from(rows(&users))]);
        assert!(
            matches!(result, Err(Error::RowsMalformed { .. })),
            "{template}"
        );
    }
}

#[test]
fn rows_and_scalars_in_one_statement() {
    let users = vec![user(1, "A"), user(2, "B")];
    let stmt = render(
        Dialect::SqlServer,
        "INSERT INTO u(id,name) VALUES :rows{id,name} ; SELECT :tag",
        &[
            Input::from(rows(&users)),
            Input::from(Params::new().with("tag", "t")),
        ],
        Limits::unlimited(),
    )
    .unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO u(id,name) VALUES (@p1,@p2),(@p3,@p4) ; SELECT @p5"
    );
}

#[test]
fn custom_conversion_field_binds_opaque() {
    #[derive(Debug, Default, Record)]
    pub struct Order {
        pub id: i64,
        pub total: Cents,
        pub refund: Option<Cents>,
    }

    let order = Order {
        id: 1,
        total: Cents(250),
        refund: None,
    };
    let stmt = sqlite("SELECT :total, :refund", &[Input::from(&order)]).unwrap();
    assert_eq!(stmt.args, [text("2.50"), SqlValue::Null]);
}
