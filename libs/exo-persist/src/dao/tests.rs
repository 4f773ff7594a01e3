// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{collections::HashMap, sync::Arc};

use crate::{
    database_error::DatabaseError,
    descriptor::{converter::BoolAsChar, Descriptor, Entity},
    runner::{with_transaction, Runner},
    schema::validation::validate,
    selection::SelectionStrategy,
    sql::{
        order::Order as OrderBy,
        predicate::{Operator, Where},
        SqlStatement, SqlValue,
    },
    testing::{Recorded, RecordingRunner, SqliteRunner},
};

use super::Dao;

const SCHEMA: &str = "
    CREATE TABLE countries (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE customers (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT,
        country_id INTEGER REFERENCES countries (id)
    );
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER REFERENCES customers (id),
        status TEXT NOT NULL,
        rush CHAR(1)
    );
    CREATE TABLE order_lines (
        id INTEGER PRIMARY KEY,
        order_id INTEGER NOT NULL REFERENCES orders (id),
        product TEXT NOT NULL,
        quantity INTEGER NOT NULL
    );
    CREATE TABLE line_notes (
        id INTEGER PRIMARY KEY,
        line_id INTEGER NOT NULL REFERENCES order_lines (id),
        body TEXT
    );
    CREATE TABLE events (message TEXT NOT NULL);
";

const SEQUENCES: [&str; 5] = [
    "countries_seq",
    "customers_seq",
    "orders_seq",
    "order_lines_seq",
    "line_notes_seq",
];

#[derive(Debug, Clone, PartialEq, Default)]
struct Country {
    id: Option<i64>,
    name: String,
}

impl Entity for Country {
    type Builder = Country;

    fn build(builder: Country) -> Result<Self, DatabaseError> {
        Ok(builder)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Customer {
    id: Option<i64>,
    name: String,
    email: Option<String>,
    country: Option<Country>,
}

impl Entity for Customer {
    type Builder = Customer;

    fn build(builder: Customer) -> Result<Self, DatabaseError> {
        Ok(builder)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Order {
    id: Option<i64>,
    customer: Option<Customer>,
    status: String,
    rush: bool,
    lines: Vec<OrderLine>,
}

#[derive(Default)]
struct OrderBuilder {
    id: Option<i64>,
    customer: Option<Customer>,
    status: Option<String>,
    rush: bool,
    lines: Vec<OrderLine>,
}

impl Entity for Order {
    type Builder = OrderBuilder;

    fn build(builder: OrderBuilder) -> Result<Self, DatabaseError> {
        Ok(Order {
            id: builder.id,
            customer: builder.customer,
            status: builder
                .status
                .ok_or_else(|| DatabaseError::Conversion("Order without status".into()))?,
            rush: builder.rush,
            lines: builder.lines,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct OrderLine {
    id: Option<i64>,
    order_id: Option<i64>,
    product: Option<String>,
    quantity: i32,
    notes: Vec<LineNote>,
}

impl Entity for OrderLine {
    type Builder = OrderLine;

    fn build(builder: OrderLine) -> Result<Self, DatabaseError> {
        Ok(builder)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct LineNote {
    id: Option<i64>,
    body: String,
}

impl Entity for LineNote {
    type Builder = LineNote;

    fn build(builder: LineNote) -> Result<Self, DatabaseError> {
        Ok(builder)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Event {
    message: String,
}

impl Entity for Event {
    type Builder = Event;

    fn build(builder: Event) -> Result<Self, DatabaseError> {
        Ok(builder)
    }
}

struct Descriptors {
    countries: Arc<Descriptor<Country>>,
    customers: Arc<Descriptor<Customer>>,
    orders: Arc<Descriptor<Order>>,
    lines: Arc<Descriptor<OrderLine>>,
    events: Arc<Descriptor<Event>>,
}

fn descriptors(strategy: SelectionStrategy) -> Descriptors {
    let mut builder = Descriptor::<Country>::builder("countries");
    builder.primary_key(
        "id",
        "countries_seq",
        |country| country.id,
        |country, id| country.id = Some(id),
        |b, id| b.id = Some(id),
    );
    builder
        .column("name", |country| country.name.clone(), |b, name| b.name = name)
        .not_null();
    let countries = builder.build().unwrap();

    let mut builder = Descriptor::<Customer>::builder("customers");
    builder.primary_key(
        "id",
        "customers_seq",
        |customer| customer.id,
        |customer, id| customer.id = Some(id),
        |b, id| b.id = Some(id),
    );
    builder
        .column("name", |customer| customer.name.clone(), |b, name| b.name = name)
        .not_null();
    builder.column(
        "email",
        |customer| customer.email.clone(),
        |b, email| b.email = email,
    );
    builder.join(
        "country_id",
        &countries,
        |customer| customer.country.as_ref(),
        |b, country| b.country = country,
    );
    builder.unique("customer_email", &["email"]);
    let customers = builder.build().unwrap();

    let mut builder = Descriptor::<LineNote>::builder("line_notes");
    builder.primary_key(
        "id",
        "line_notes_seq",
        |note| note.id,
        |note, id| note.id = Some(id),
        |b, id| b.id = Some(id),
    );
    builder.parent("line_id");
    builder.column("body", |note| note.body.clone(), |b, body| b.body = body);
    builder.selection_strategy(strategy);
    let notes = builder.build().unwrap();

    let mut builder = Descriptor::<OrderLine>::builder("order_lines");
    builder.primary_key(
        "id",
        "order_lines_seq",
        |line| line.id,
        |line, id| line.id = Some(id),
        |b, id| b.id = Some(id),
    );
    builder.parent_with_back_reference(
        "order_id",
        |line, order_id: i64| line.order_id = Some(order_id),
        |b, order_id: i64| b.order_id = Some(order_id),
    );
    builder
        .column(
            "product",
            |line| line.product.clone(),
            |b, product| b.product = product,
        )
        .not_null();
    builder
        .column("quantity", |line| line.quantity, |b, quantity| b.quantity = quantity)
        .not_null();
    builder
        .children(
            "notes",
            &notes,
            |line| &mut line.notes,
            |b, notes| b.notes = notes,
        )
        .selection_strategy(strategy);
    let lines = builder.build().unwrap();

    let mut builder = Descriptor::<Order>::builder("orders");
    builder.primary_key(
        "id",
        "orders_seq",
        |order| order.id,
        |order, id| order.id = Some(id),
        |b, id| b.id = Some(id),
    );
    builder.join(
        "customer_id",
        &customers,
        |order| order.customer.as_ref(),
        |b, customer| b.customer = customer,
    );
    builder
        .column(
            "status",
            |order| order.status.clone(),
            |b, status: String| b.status = Some(status),
        )
        .not_null();
    builder.column_converted("rush", BoolAsChar, |order| order.rush, |b, rush| b.rush = rush);
    builder
        .children(
            "lines",
            &lines,
            |order| &mut order.lines,
            |b, lines| b.lines = lines,
        )
        .selection_strategy(strategy);
    let orders = builder.build().unwrap();

    let mut builder = Descriptor::<Event>::builder("events");
    builder
        .column("message", |event| event.message.clone(), |b, message| b.message = message)
        .not_null();
    let events = builder.build().unwrap();

    Descriptors {
        countries,
        customers,
        orders,
        lines,
        events,
    }
}

fn sqlite() -> SqliteRunner {
    let mut runner = SqliteRunner::new().unwrap();
    runner.execute_batch(SCHEMA).unwrap();
    for sequence in SEQUENCES {
        runner.create_sequence(sequence);
    }
    runner
}

fn note(body: &str) -> LineNote {
    LineNote {
        id: None,
        body: body.to_string(),
    }
}

fn line(product: &str, quantity: i32, notes: Vec<LineNote>) -> OrderLine {
    OrderLine {
        id: None,
        order_id: None,
        product: Some(product.to_string()),
        quantity,
        notes,
    }
}

fn order(customer: Option<Customer>, status: &str, lines: Vec<OrderLine>) -> Order {
    Order {
        id: None,
        customer,
        status: status.to_string(),
        rush: false,
        lines,
    }
}

async fn seed_customer(descriptors: &Descriptors, runner: &mut dyn Runner) -> Customer {
    let mut country = Country {
        id: None,
        name: "Iceland".to_string(),
    };
    Dao::keyed(descriptors.countries.clone(), &mut *runner)
        .unwrap()
        .insert(&mut country)
        .await
        .unwrap();

    let mut customer = Customer {
        id: None,
        name: "Ada".to_string(),
        email: Some("ada@example.com".to_string()),
        country: Some(country),
    };
    Dao::keyed(descriptors.customers.clone(), runner)
        .unwrap()
        .insert(&mut customer)
        .await
        .unwrap();

    customer
}

async fn seed_orders(descriptors: &Descriptors, runner: &mut dyn Runner) -> Vec<Order> {
    let customer = seed_customer(descriptors, &mut *runner).await;

    let mut orders = vec![
        order(
            Some(customer.clone()),
            "open",
            vec![
                line("apples", 2, vec![note("ripe"), note("green")]),
                line("pears", 1, vec![]),
            ],
        ),
        order(None, "shipped", vec![line("plums", 6, vec![note("fragile")])]),
        order(Some(customer.clone()), "open", vec![]),
        order(
            Some(customer),
            "cancelled",
            vec![line("figs", 1, vec![note("dried")])],
        ),
    ];

    let mut dao = Dao::keyed(descriptors.orders.clone(), runner).unwrap();
    for order in &mut orders {
        dao.insert(order).await.unwrap();
    }
    orders
}

async fn count(runner: &mut dyn Runner, table: &str) -> i64 {
    let rows = runner
        .query(&SqlStatement {
            sql: format!("SELECT count(*) AS n FROM {table}"),
            params: vec![],
        })
        .await
        .unwrap();

    match rows[0].get("n") {
        Some(SqlValue::BigInt(n)) => *n,
        other => panic!("Unexpected count {other:?}"),
    }
}

#[test_log::test(tokio::test)]
async fn round_trip_with_grandchildren() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = sqlite();
    let customer = seed_customer(&descriptors, &mut runner).await;

    let mut order = Order {
        rush: true,
        ..order(
            Some(customer),
            "open",
            vec![
                line("apples", 3, vec![note("ripe"), note("green")]),
                line("pears", 1, vec![]),
            ],
        )
    };

    let key = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .insert(&mut order)
        .await
        .unwrap();

    assert_eq!(key, SqlValue::BigInt(1));
    assert_eq!(order.id, Some(1));
    assert_eq!(order.lines[0].id, Some(1));
    assert_eq!(order.lines[0].order_id, Some(1));
    assert_eq!(order.lines[1].id, Some(2));
    assert_eq!(order.lines[1].order_id, Some(1));
    assert_eq!(order.lines[0].notes[0].id, Some(1));
    assert_eq!(order.lines[0].notes[1].id, Some(2));

    let loaded = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .select_by_id(1i64)
        .await
        .unwrap();
    assert_eq!(loaded, Some(order));

    let missing = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .select_by_id(42i64)
        .await
        .unwrap();
    assert_eq!(missing, None);
}

#[test_log::test(tokio::test)]
async fn saving_deletes_orphans() {
    let descriptors = descriptors(SelectionStrategy::ByKeysInClause);
    let mut runner = sqlite();
    let customer = seed_customer(&descriptors, &mut runner).await;

    let mut order = order(
        Some(customer),
        "open",
        vec![
            line("apples", 1, vec![note("ripe")]),
            line("pears", 2, vec![note("soft")]),
            line("plums", 3, vec![note("fragile"), note("dark")]),
        ],
    );
    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .insert(&mut order)
        .await
        .unwrap();
    let pears_id = order.lines[1].id;

    order.lines.retain(|line| line.product.as_deref() == Some("pears"));
    order.lines[0].quantity = 5;
    order.lines[0].notes[0].body = "very soft".to_string();

    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .save(&mut order)
        .await
        .unwrap();

    assert_eq!(order.lines[0].id, pears_id);
    assert_eq!(count(&mut runner, "order_lines").await, 1);
    assert_eq!(count(&mut runner, "line_notes").await, 1);

    let loaded = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .select_by_id(order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.lines, order.lines);
    assert_eq!(loaded.lines[0].quantity, 5);
    assert_eq!(loaded.lines[0].notes[0].body, "very soft");

    // An empty list orphans every child
    order.lines.clear();
    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .save(&mut order)
        .await
        .unwrap();
    assert_eq!(count(&mut runner, "order_lines").await, 0);
    assert_eq!(count(&mut runner, "line_notes").await, 0);
    assert_eq!(count(&mut runner, "orders").await, 1);
}

#[test_log::test(tokio::test)]
async fn new_children_of_existing_parents_are_inserted() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = sqlite();

    let mut order = order(None, "open", vec![line("apples", 1, vec![])]);
    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .insert(&mut order)
        .await
        .unwrap();

    order.lines.push(line("pears", 2, vec![note("soft")]));
    order.lines[0].notes.push(note("ripe"));
    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .save(&mut order)
        .await
        .unwrap();

    assert_eq!(order.lines[1].id, Some(2));
    assert_eq!(order.lines[1].order_id, order.id);

    let loaded = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .select_by_id(order.id)
        .await
        .unwrap();
    assert_eq!(loaded, Some(order));
}

#[test_log::test(tokio::test)]
async fn new_parents_adopt_persisted_children() {
    let descriptors = descriptors(SelectionStrategy::ByKeysInClause);
    let mut runner = RecordingRunner::new(sqlite());

    let mut first = order(None, "open", vec![line("apples", 1, vec![note("ripe")])]);
    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .insert(&mut first)
        .await
        .unwrap();

    runner.clear();
    let mut second = order(
        None,
        "open",
        vec![first.lines[0].clone(), line("pears", 2, vec![])],
    );
    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .insert(&mut second)
        .await
        .unwrap();

    assert_eq!(second.id, Some(2));
    assert_eq!(second.lines[0].id, first.lines[0].id);
    assert_eq!(second.lines[0].order_id, Some(2));
    assert_eq!(second.lines[1].id, Some(2));
    assert_eq!(
        runner
            .statements()
            .iter()
            .filter(|sql| sql.starts_with("INSERT INTO order_lines"))
            .count(),
        1
    );

    assert_eq!(count(&mut runner, "order_lines").await, 2);
    assert_eq!(count(&mut runner, "line_notes").await, 1);

    let mut dao = Dao::keyed(descriptors.orders.clone(), &mut runner).unwrap();
    let reloaded_first = dao.select_by_id(first.id).await.unwrap().unwrap();
    let reloaded_second = dao.select_by_id(second.id).await.unwrap();
    assert!(reloaded_first.lines.is_empty());
    assert_eq!(reloaded_second, Some(second));
}

#[test_log::test(tokio::test)]
async fn updates_keep_the_key() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = RecordingRunner::new(sqlite());

    let mut order = order(None, "open", vec![line("apples", 1, vec![])]);
    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .insert(&mut order)
        .await
        .unwrap();
    let (order_id, line_id) = (order.id, order.lines[0].id);

    runner.clear();
    order.status = "shipped".to_string();
    order.lines[0].quantity = 4;
    let key = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .update(&mut order)
        .await
        .unwrap();

    assert_eq!(key, SqlValue::BigInt(1));
    assert_eq!((order.id, order.lines[0].id), (order_id, line_id));
    assert_eq!(
        runner.statements(),
        vec![
            "UPDATE orders SET status = ?, rush = ?, customer_id = ? WHERE id = ?",
            "SELECT a.id AS a_id FROM order_lines a WHERE 1=1 AND a.order_id = ? ORDER BY a.id ASC",
            "UPDATE order_lines SET product = ?, quantity = ?, order_id = ? WHERE id = ?",
            "SELECT a.id AS a_id FROM line_notes a WHERE 1=1 AND a.line_id = ? ORDER BY a.id ASC",
        ]
    );
    assert!(
        !runner
            .recorded()
            .iter()
            .any(|recorded| matches!(recorded, Recorded::NextSequenceValue(_)))
    );
}

#[test_log::test(tokio::test)]
async fn strategies_load_identical_graphs() {
    let predicate =
        Where::new("status", Operator::Eq, "open").or("status", Operator::Eq, "shipped");
    let order_by = OrderBy::ascending(["id"]).unwrap();

    let mut results = vec![];
    for strategy in [
        SelectionStrategy::Standard,
        SelectionStrategy::ByKeysInClause,
        SelectionStrategy::SubSelectInClause,
    ] {
        let descriptors = descriptors(strategy);
        let mut runner = RecordingRunner::new(sqlite());
        let seeded = seed_orders(&descriptors, &mut runner).await;

        runner.clear();
        let loaded = Dao::keyed(descriptors.orders.clone(), &mut runner)
            .unwrap()
            .select_where(&predicate, Some(&order_by))
            .await
            .unwrap();

        assert_eq!(loaded, seeded[..3].to_vec(), "{strategy}");

        if strategy == SelectionStrategy::SubSelectInClause {
            let statements = runner.statements();
            assert!(statements[1].contains("a.order_id IN (SELECT b.id FROM orders b"));
            assert!(statements[2].contains("a.line_id IN (SELECT b.id FROM order_lines b"));
            assert!(statements[2].contains("b.order_id IN (SELECT c.id FROM orders c"));
        }

        results.push((runner.query_count(), loaded));
    }

    // One query for the orders (with their customers and countries), then per order and per
    // line for the standard strategy, and once per relationship for the others
    assert_eq!(results[0].0, 7);
    assert_eq!(results[1].0, 3);
    assert_eq!(results[2].0, 3);

    assert_eq!(results[0].1, results[1].1);
    assert_eq!(results[0].1, results[2].1);
}

#[test_log::test(tokio::test)]
async fn null_in_not_null_column_executes_nothing() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = RecordingRunner::new(sqlite());

    let mut order = order(
        None,
        "open",
        vec![line("apples", 1, vec![]), line("pears", 1, vec![])],
    );
    order.lines[1].product = None;

    let error = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .insert(&mut order)
        .await
        .unwrap_err();

    assert!(
        matches!(&error, DatabaseError::ConstraintViolation(message) if message == "order_lines.product must not be null"),
        "{error:?}"
    );
    assert!(runner.recorded().is_empty());
    assert_eq!(order.id, None);

    order.id = Some(1);
    let error = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .save(&mut order)
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::ConstraintViolation(_)));
    assert!(runner.recorded().is_empty());
}

#[test_log::test(tokio::test)]
async fn joined_entities_are_read_but_not_cascaded() {
    let descriptors = descriptors(SelectionStrategy::SubSelectInClause);
    let mut runner = sqlite();
    let orders = seed_orders(&descriptors, &mut runner).await;

    let loaded = Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .select_all()
        .await
        .unwrap();
    assert_eq!(loaded, orders);
    assert_eq!(loaded[1].customer, None);
    assert_eq!(
        loaded[0].customer.as_ref().and_then(|c| c.country.as_ref()),
        Some(&Country {
            id: Some(1),
            name: "Iceland".to_string()
        })
    );

    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .delete(&orders[0])
        .await
        .unwrap();

    assert_eq!(count(&mut runner, "orders").await, 3);
    assert_eq!(count(&mut runner, "order_lines").await, 2);
    assert_eq!(count(&mut runner, "line_notes").await, 2);
    assert_eq!(count(&mut runner, "customers").await, 1);
    assert_eq!(count(&mut runner, "countries").await, 1);

    Dao::keyed(descriptors.orders.clone(), &mut runner)
        .unwrap()
        .delete_by_id(orders[3].id)
        .await
        .unwrap();
    assert_eq!(count(&mut runner, "orders").await, 2);
    assert_eq!(count(&mut runner, "line_notes").await, 1);
}

#[test_log::test(tokio::test)]
async fn selects_by_columns() {
    let descriptors = descriptors(SelectionStrategy::ByKeysInClause);
    let mut runner = sqlite();
    let orders = seed_orders(&descriptors, &mut runner).await;

    let mut dao = Dao::keyed(descriptors.orders.clone(), &mut runner).unwrap();

    let open = dao
        .select_by_columns(&[("status", SqlValue::from("open"))])
        .await
        .unwrap();
    assert_eq!(open, vec![orders[0].clone(), orders[2].clone()]);

    let without_customer = dao
        .select_by_columns(&[("customer_id", SqlValue::Null)])
        .await
        .unwrap();
    assert_eq!(without_customer, vec![orders[1].clone()]);

    let operators = HashMap::from([("status".to_string(), Operator::Like)]);
    let like = dao
        .select_by_columns_with(
            &[("status", SqlValue::from("%ed")), ("rush", SqlValue::from("F"))],
            &operators,
        )
        .await
        .unwrap();
    assert_eq!(like, vec![orders[1].clone(), orders[3].clone()]);

    let newest = dao
        .select_where(
            &Where::new("id", Operator::Gt, 1i64),
            Some(&OrderBy::descending(["id"]).unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(
        newest.iter().map(|order| order.id).collect::<Vec<_>>(),
        vec![Some(4), Some(3), Some(2)]
    );

    // Unknown columns are reported by the database
    let error = dao
        .select_by_columns(&[("colour", SqlValue::from("red"))])
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::Execution { .. }));
}

#[test_log::test(tokio::test)]
async fn selects_by_unique_constraint() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = sqlite();
    let customer = seed_customer(&descriptors, &mut runner).await;

    let mut dao = Dao::keyed(descriptors.customers.clone(), &mut runner).unwrap();

    let found = dao
        .select_by_unique("customer_email", &[SqlValue::from("ada@example.com")])
        .await
        .unwrap();
    assert_eq!(found, Some(customer));

    let missing = dao
        .select_by_unique("customer_email", &[SqlValue::from("bob@example.com")])
        .await
        .unwrap();
    assert_eq!(missing, None);

    assert!(matches!(
        dao.select_by_unique("customer_name", &[SqlValue::from("Ada")])
            .await,
        Err(DatabaseError::Config(_))
    ));
    assert!(matches!(
        dao.select_by_unique("customer_email", &[]).await,
        Err(DatabaseError::Config(_))
    ));
}

#[test_log::test(tokio::test)]
async fn transactions_roll_back_failed_work() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = sqlite();

    let mut rejected = order(None, "open", vec![line("apples", 1, vec![note("ripe")])]);
    let result = with_transaction(&mut runner, async |runner: &mut SqliteRunner| {
        Dao::keyed(descriptors.orders.clone(), runner)?
            .insert(&mut rejected)
            .await?;
        Err::<(), _>(DatabaseError::Validation("rejected".into()))
    })
    .await;

    assert!(matches!(result, Err(DatabaseError::Validation(_))));
    assert_eq!(count(&mut runner, "orders").await, 0);
    assert_eq!(count(&mut runner, "order_lines").await, 0);
    assert_eq!(count(&mut runner, "line_notes").await, 0);

    let mut accepted = order(None, "open", vec![line("apples", 1, vec![note("ripe")])]);
    let key = with_transaction(&mut runner, async |runner: &mut SqliteRunner| {
        Dao::keyed(descriptors.orders.clone(), runner)?
            .insert(&mut accepted)
            .await
    })
    .await
    .unwrap();

    // Sequences are not rolled back
    assert_eq!(key, SqlValue::BigInt(2));
    assert_eq!(count(&mut runner, "orders").await, 1);
    assert_eq!(count(&mut runner, "line_notes").await, 1);
}

#[test_log::test(tokio::test)]
async fn unkeyed_entities() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = sqlite();

    assert!(matches!(
        Dao::keyed(descriptors.events.clone(), &mut runner),
        Err(DatabaseError::Config(_))
    ));

    let mut dao = Dao::new(descriptors.events.clone(), &mut runner);
    let mut event = Event {
        message: "started".to_string(),
    };
    assert_eq!(dao.insert(&mut event).await.unwrap(), SqlValue::Null);
    assert_eq!(dao.select_all().await.unwrap(), vec![event.clone()]);

    assert!(matches!(
        dao.delete(&event).await,
        Err(DatabaseError::Config(_))
    ));
    assert!(matches!(
        dao.save(&mut event).await,
        Err(DatabaseError::Config(_))
    ));
}

#[test_log::test(tokio::test)]
async fn children_are_saved_through_their_parent() {
    let descriptors = descriptors(SelectionStrategy::Standard);
    let mut runner = RecordingRunner::new(sqlite());

    let mut line = line("apples", 1, vec![]);
    let error = Dao::keyed(descriptors.lines.clone(), &mut runner)
        .unwrap()
        .insert(&mut line)
        .await
        .unwrap_err();

    assert!(matches!(error, DatabaseError::Config(_)));
    assert!(runner.recorded().is_empty());
}

#[test_log::test(tokio::test)]
async fn validates_against_the_database() {
    let descriptors = descriptors(SelectionStrategy::Standard);

    let mut runner = sqlite();
    validate(descriptors.orders.metadata(), &mut runner)
        .await
        .unwrap();

    let mut runner = SqliteRunner::new().unwrap();
    runner
        .execute_batch(
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, status INTEGER, rush CHAR(1));
             CREATE TABLE order_lines (id INTEGER PRIMARY KEY, order_id INTEGER, product TEXT, quantity INTEGER);",
        )
        .unwrap();
    runner.create_sequence("orders_seq");

    let error = validate(descriptors.orders.metadata(), &mut runner)
        .await
        .unwrap_err();
    let DatabaseError::Validation(report) = error else {
        panic!("Expected a validation error, got {error:?}");
    };

    for expected in [
        "Column orders.status has type integer",
        "Table customers does not exist",
        "Sequence order_lines_seq for order_lines.id does not exist",
        "Table line_notes does not exist",
    ] {
        assert!(report.contains(expected), "{expected} not in {report}");
    }
}
