use crate::features::world::CrudgateWorld;
use crudgate_core::access::{
    AccessContext, AccessEngine, AccessKind, FieldMask, PermissionFields, Principal, Projection, RoleSet,
};
use cucumber::{given, then, when};
use serde_json::{json, Value};

fn tags(list: &str) -> Vec<String> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

#[given(expr = "the caller holds roles {string}")]
async fn given_roles(world: &mut CrudgateWorld, roles: String) {
    world.context = AccessContext::new(Principal::anonymous(), tags(&roles).into_iter().collect());
}

#[given(expr = "the caller is user {string} holding roles {string}")]
async fn given_caller(world: &mut CrudgateWorld, user: String, roles: String) {
    world.context = AccessContext::new(Principal::user(user), tags(&roles).into_iter().collect());
}

#[given(expr = "a record whose writer owners are {string} and writer roles are {string}")]
async fn given_writer_fields(world: &mut CrudgateWorld, owners: String, roles: String) {
    let doc = json!({
        "permissionWriterUserId": tags(&owners),
        "permissionWriterRoles": tags(&roles),
    });
    world.fields = PermissionFields::from_document(&doc).expect("valid permission fields");
}

#[when(regex = r"^the document (\{.*\}) is masked twice$")]
async fn when_masked_twice(world: &mut CrudgateWorld, doc: String) {
    let doc: Value = serde_json::from_str(&doc).expect("valid JSON document");
    let roles: &RoleSet = &world.context.roles;

    let first_mask = FieldMask::compute(&world.properties_roles, roles);
    let second_mask = FieldMask::compute(&world.properties_roles, roles);
    assert_eq!(first_mask, second_mask);

    let mut once = doc;
    Projection::default().restrict(&first_mask).apply(&mut once);
    let mut twice = once.clone();
    Projection::default().restrict(&second_mask).apply(&mut twice);
    world.masked = vec![once, twice];
}

#[then("both masked documents are equal")]
async fn then_masks_equal(world: &mut CrudgateWorld) {
    assert_eq!(world.masked.len(), 2);
    assert_eq!(world.masked[0], world.masked[1]);
}

#[then(expr = "the masked document has fields {string}")]
async fn then_masked_fields(world: &mut CrudgateWorld, fields: String) {
    let mut keys: Vec<String> = world.masked[0]
        .as_object()
        .expect("an object")
        .keys()
        .cloned()
        .collect();
    keys.sort();
    let mut expected = tags(&fields);
    expected.sort();
    assert_eq!(keys, expected);
}

#[then(expr = "the update decision is {word} whichever check runs first")]
async fn then_union(world: &mut CrudgateWorld, granted: String) {
    let expected: bool = granted.parse().expect("true or false");
    let ctx = &world.context;
    let fields = &world.fields;

    let owner = ctx
        .user_id()
        .map(|uid| fields.owners(AccessKind::Write).iter().any(|o| o == uid))
        .unwrap_or(false);
    let role = ctx.roles.intersects(fields.roles(AccessKind::Write));

    assert_eq!(owner || role, role || owner);
    assert_eq!(AccessEngine::permits(AccessKind::Write, ctx, fields), expected);
}
