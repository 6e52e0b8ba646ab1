use crate::features::world::{CrudgateWorld, RECORDS_PATH};
use crudgate_core::query::Filter;
use crudgate_core::store::RecordStore;
use cucumber::{given, then, when};
use hyper::Method;
use serde_json::json;

const LAST_CREATED: &str = "that record";

fn tags(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

// --- Setup ---

#[given(expr = "group {string} grants {string} to {string}")]
async fn given_group(world: &mut CrudgateWorld, name: String, permission: String, member: String) {
    world.add_group(&name, &[permission.as_str()], &[member.as_str()]).await;
}

#[given(expr = "a record {string} with writer roles {string}")]
async fn given_writer_roles(world: &mut CrudgateWorld, alias: String, roles: String) {
    world.add_record(&alias, json!({"title": "draft", "permissionWriterRoles": tags(&roles)})).await;
}

#[given(expr = "a record {string} with delete roles {string}")]
async fn given_delete_roles(world: &mut CrudgateWorld, alias: String, roles: String) {
    world.add_record(&alias, json!({"title": "old", "permissionDeleteRoles": tags(&roles)})).await;
}

#[given(expr = "a record {string} readable by role {string}")]
async fn given_reader_role(world: &mut CrudgateWorld, alias: String, role: String) {
    world.add_record(&alias, json!({"permissionReaderRoles": [role]})).await;
}

#[given(expr = "a record {string} readable by role {string} with salary {int}")]
async fn given_salaried(world: &mut CrudgateWorld, alias: String, role: String, salary: i64) {
    world
        .add_record(&alias, json!({"name": "Ada", "salary": salary, "permissionReaderRoles": [role]}))
        .await;
}

#[given(expr = "a record {string} readable by user {string}")]
async fn given_reader_owner(world: &mut CrudgateWorld, alias: String, user: String) {
    world.add_record(&alias, json!({"permissionReaderUserId": [user]})).await;
}

#[given(expr = "field {string} requires role {string}")]
async fn given_protected_field(world: &mut CrudgateWorld, field: String, role: String) {
    world.properties_roles.entry(field).or_default().push(role);
}

#[given("the group store is unavailable")]
async fn given_groups_down(world: &mut CrudgateWorld) {
    world.group_store_down = true;
}

// --- Requests ---

async fn create_record(world: &mut CrudgateWorld, user: &str, title: &str) {
    world.send(Method::POST, RECORDS_PATH, Some(user), Some(json!({"title": title}))).await;
    if let Some(id) = world.last_body["id"].as_str() {
        world.aliases.insert(LAST_CREATED.to_string(), id.to_string());
    }
}

#[given(expr = "user {string} created a record titled {string}")]
async fn given_created(world: &mut CrudgateWorld, user: String, title: String) {
    create_record(world, &user, &title).await;
}

#[when(expr = "user {string} creates a record titled {string}")]
async fn when_creates(world: &mut CrudgateWorld, user: String, title: String) {
    create_record(world, &user, &title).await;
}

#[when(expr = "user {string} reads that record")]
async fn read_last(world: &mut CrudgateWorld, user: String) {
    let path = world.record_path(LAST_CREATED);
    world.send(Method::GET, &path, Some(&user), None).await;
}

#[when(expr = "user {string} reads record {string}")]
async fn read_record(world: &mut CrudgateWorld, user: String, alias: String) {
    let path = world.record_path(&alias);
    world.send(Method::GET, &path, Some(&user), None).await;
}

#[when(expr = "user {string} updates record {string} with title {string}")]
async fn update_record(world: &mut CrudgateWorld, user: String, alias: String, title: String) {
    let path = world.record_path(&alias);
    world.send(Method::PUT, &path, Some(&user), Some(json!({"title": title}))).await;
}

#[when(expr = "user {string} deletes record {string}")]
async fn delete_record(world: &mut CrudgateWorld, user: String, alias: String) {
    let path = world.record_path(&alias);
    world.send(Method::DELETE, &path, Some(&user), None).await;
}

#[when(expr = "user {string} lists records")]
async fn list_records(world: &mut CrudgateWorld, user: String) {
    world.send(Method::GET, RECORDS_PATH, Some(&user), None).await;
}

#[when(expr = "user {string} lists records selecting {string}")]
async fn list_selecting(world: &mut CrudgateWorld, user: String, select: String) {
    let path = format!("{}?select={}", RECORDS_PATH, urlencoding::encode(&select));
    world.send(Method::GET, &path, Some(&user), None).await;
}

#[when(expr = "user {string} lists records filtered by title {string}")]
async fn list_filtered(world: &mut CrudgateWorld, user: String, title: String) {
    let query = json!({"where": {"title": title}}).to_string();
    let path = format!("{}?query={}", RECORDS_PATH, urlencoding::encode(&query));
    world.send(Method::GET, &path, Some(&user), None).await;
}

// --- Assertions ---

#[then(expr = "the response status is {int}")]
async fn then_status(world: &mut CrudgateWorld, status: u16) {
    let actual = world.last_status.expect("a request was sent");
    assert_eq!(actual.as_u16(), status, "body: {}", world.last_body);
}

#[then(expr = "the error code is {string}")]
async fn then_error_code(world: &mut CrudgateWorld, code: String) {
    assert_eq!(world.last_body["error"], json!(code));
}

#[then(expr = "the response field {string} is {string}")]
async fn then_field(world: &mut CrudgateWorld, field: String, value: String) {
    assert_eq!(world.last_body[field.as_str()], json!(value));
}

#[then(expr = "the created record lists {string} as reader, writer and deleter")]
async fn then_owned_by(world: &mut CrudgateWorld, user: String) {
    assert_eq!(world.last_status.map(|s| s.as_u16()), Some(201), "body: {}", world.last_body);
    for field in ["permissionReaderUserId", "permissionWriterUserId", "permissionDeleteUserId"] {
        assert_eq!(world.last_body[field], json!([user]), "{}", field);
    }
}

#[then("the created record has no role tags")]
async fn then_no_roles(world: &mut CrudgateWorld) {
    for field in ["permissionReaderRoles", "permissionWriterRoles", "permissionDeleteRoles"] {
        assert_eq!(world.last_body[field], json!([]), "{}", field);
    }
}

#[then(expr = "record {string} still has writer roles {string}")]
async fn then_stored_writer_roles(world: &mut CrudgateWorld, alias: String, roles: String) {
    let stored = world
        .records
        .find_by_id(&alias, &Filter::All)
        .await
        .expect("store reachable")
        .expect("record exists");
    assert_eq!(stored["permissionWriterRoles"], json!(tags(&roles)));
}

#[then(expr = "every listed record hides field {string}")]
async fn then_hidden(world: &mut CrudgateWorld, field: String) {
    let items = world.last_body["data"].as_array().expect("a paginated list");
    assert!(!items.is_empty(), "nothing listed");
    for item in items {
        assert!(item.get(&field).is_none(), "{} leaked in {}", field, item);
    }
}

#[then(expr = "the listed record {string} shows field {string}")]
async fn then_shown(world: &mut CrudgateWorld, alias: String, field: String) {
    let items = world.last_body["data"].as_array().expect("a paginated list");
    let item = items.iter().find(|i| i["id"] == json!(alias)).expect("record listed");
    assert!(item.get(&field).is_some(), "{} missing from {}", field, item);
}

#[then(expr = "the listed records are {string}")]
async fn then_listed(world: &mut CrudgateWorld, aliases: String) {
    assert_eq!(world.listed_ids(), tags(&aliases));
}

#[then("no records are listed")]
async fn then_none_listed(world: &mut CrudgateWorld) {
    assert!(world.listed_ids().is_empty());
    assert_eq!(world.last_body["total"], json!(0));
}
