use micro_route::{
    resolve_requirements, resolve_route_requirements, AuthMethod, GuardPipeline, MethodConfig, PathNode,
    PermissionSpec, RequirementSet, Requirements, RouteCompiler, RouteConfig, RouteTable, StageKind,
};
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

type RouteKey = (String, String);

fn routes(table: &RouteTable) -> BTreeMap<RouteKey, (String, RequirementSet, GuardPipeline)> {
    table
        .iter()
        .map(|route| {
            let key = (route.method().to_string(), route.path().to_owned());
            (key, (route.handler().to_owned(), route.requirements().clone(), route.pipeline().clone()))
        })
        .collect()
}

fn compile_agreeing_with_resolver(config: &RouteConfig, overrides: impl Fn(&str, &str) -> Requirements) -> RouteTable {
    let table = RouteCompiler::new(config).compile().unwrap();
    for route in table.iter() {
        let resolved = resolve_route_requirements(
            config,
            route.method(),
            route.path(),
            &overrides(route.method().as_str(), route.path()),
        );
        assert_eq!(route.requirements(), &resolved, "{} {}", route.method(), route.path());
    }
    table
}

fn no_overrides(_: &str, _: &str) -> Requirements {
    Requirements::new()
}

#[test]
fn compiled_requirements_match_the_resolver() {
    init_tracing();
    let config = RouteConfig::from_value(json!({
        "required_headers": ["X-Client"],
        "paths": {
            "/": {
                "methods": {"GET": {"handler": "home"}},
                "paths": {
                    "/admin": {
                        "require_auth": true,
                        "require_permissions": ["admin"],
                        "paths": {
                            "/users/{id:number}": {
                                "methods": {
                                    "GET": {"handler": "users.show"},
                                    "DELETE": {"handler": "users.delete", "require_permissions": [["users.delete"], ["root"]]}
                                }
                            }
                        }
                    }
                }
            }
        }
    }))
    .unwrap();

    let table = compile_agreeing_with_resolver(&config, |method, _| match method {
        "DELETE" => Requirements::new().require_permissions(PermissionSpec::Alternatives(vec![
            vec!["users.delete".into()],
            vec!["root".into()],
        ])),
        _ => Requirements::new(),
    });
    assert_eq!(table.len(), 3);

    let delete = table.routes().iter().find(|route| route.handler() == "users.delete").unwrap();
    assert_eq!(delete.requirements().require_permissions.len(), 2);
    assert_eq!(
        delete.pipeline().kinds(),
        vec![StageKind::Permissions, StageKind::Authentication, StageKind::RequiredHeaders]
    );

    // a `/` child shares its parent's path but not its requirements
    let config = RouteConfig::from_value(json!({
        "paths": {"/admin": {
            "methods": {"GET": {"handler": "admin.index"}},
            "paths": {"/": {"require_auth": true, "methods": {"POST": {"handler": "admin.create"}}}}
        }}
    }))
    .unwrap();

    let table = compile_agreeing_with_resolver(&config, no_overrides);
    let auth: Vec<_> = table.iter().map(|route| (route.method().as_str(), route.requirements().require_auth)).collect();
    assert_eq!(auth, vec![("GET", false), ("POST", true)]);
    assert!(!resolve_requirements(&config, "/admin", &Requirements::new()).require_auth);

    // overlapping sibling keys resolve along the nesting the route was declared in
    let config = RouteConfig::from_value(json!({
        "paths": {
            "/a": {"paths": {"/b": {"methods": {"GET": {"handler": "nested"}}}}},
            "/a/b": {"require_auth": true}
        }
    }))
    .unwrap();

    let table = compile_agreeing_with_resolver(&config, no_overrides);
    assert_eq!(table.len(), 1);
    assert!(!table.routes()[0].requirements().require_auth);
    assert!(!resolve_requirements(&config, "/a/b", &Requirements::new()).require_auth);
}

#[test]
fn merging_modules_builds_one_table() {
    init_tracing();
    let users = RouteConfig::new().path(
        "/admin",
        PathNode::new()
            .requires(Requirements::new().require_auth(true))
            .path("/users", PathNode::new().method("GET", MethodConfig::handler("users.list"))),
    );
    let reports = RouteConfig::new().path(
        "/admin",
        PathNode::new().path(
            "/reports",
            PathNode::new().method(
                "GET",
                MethodConfig::handler("reports.list").requires(Requirements::new().auth_method(AuthMethod::Token)),
            ),
        ),
    );

    let merged = users.merge(reports);
    let table = RouteCompiler::new(&merged).compile().unwrap();

    let paths: Vec<_> = table.iter().map(|route| route.path()).collect();
    assert_eq!(paths, vec!["/admin/users", "/admin/reports"]);

    let reports = &table.routes()[1];
    assert!(reports.requirements().require_auth, "node requirements apply to routes merged in later");
    assert_eq!(reports.requirements().auth_method, AuthMethod::Token);
}

#[test]
fn merging_never_weakens_routes_already_declared() {
    init_tracing();
    let first = RouteConfig::new().path(
        "/admin",
        PathNode::new()
            .requires(Requirements::new().require_auth(true))
            .path("/users", PathNode::new().method("GET", MethodConfig::handler("users.list"))),
    );
    let second = RouteConfig::new().path(
        "/admin",
        PathNode::new()
            .requires(Requirements::new().require_auth(false))
            .path("/health", PathNode::new().method("GET", MethodConfig::handler("health"))),
    );

    let alone = RouteCompiler::new(&first).compile().unwrap();
    assert!(alone.routes()[0].requirements().require_auth);

    let merged = first.merge(second);
    let table = RouteCompiler::new(&merged).compile().unwrap();

    let users = table.iter().find(|route| route.path() == "/admin/users").unwrap();
    assert!(users.requirements().require_auth);
    assert_eq!(users.pipeline().kinds(), vec![StageKind::Authentication]);

    let health = table.iter().find(|route| route.path() == "/admin/health").unwrap();
    assert!(health.requirements().require_auth, "routes merged in sit under the existing node");
}

const ROOTS: [&str; 2] = ["/a", "/b"];
const CHILDREN: [&str; 2] = ["/x", "/{id}"];
const VERBS: [&str; 3] = ["GET", "POST", "DELETE"];
const CONTENT_TYPES: [&str; 2] = ["application/json", "text/plain"];

#[derive(Debug, Clone)]
struct Declaration {
    root: usize,
    child: Option<usize>,
    verb: usize,
    handler: u8,
    require_auth: Option<bool>,
    headers: Option<Vec<String>>,
    content_type: Option<usize>,
}

// node keys carry the same requirements in every tree, so merging can only
// change what the verbs declare
fn node_requirements(key: &str) -> Requirements {
    match key {
        "/a" => Requirements::new().require_auth(true).required_headers(["X-A"]),
        "/b" => Requirements::new().auth_method(AuthMethod::Token).required_permission_groups(["staff"]),
        "/x" => Requirements::new().required_fields(["x"]),
        _ => Requirements::new().require_auth(false),
    }
}

fn build(declarations: &[Declaration], tag: &str) -> RouteConfig {
    declarations.iter().fold(RouteConfig::new(), |config, declaration| {
        let mut requirements = Requirements::new();
        requirements.require_auth = declaration.require_auth;
        requirements.required_headers.clone_from(&declaration.headers);
        requirements.required_content_type = declaration.content_type.map(|i| CONTENT_TYPES[i].to_owned());

        let verb = VERBS[declaration.verb];
        let method = MethodConfig::handler(format!("{tag}{}", declaration.handler)).requires(requirements);
        let root = ROOTS[declaration.root];
        let node = match declaration.child {
            Some(child) => {
                let key = CHILDREN[child];
                PathNode::new().path(key, PathNode::new().requires(node_requirements(key)).method(verb, method))
            }
            None => PathNode::new().method(verb, method),
        };
        config.path(root, node.requires(node_requirements(root)))
    })
}

fn declaration() -> impl Strategy<Value = Declaration> {
    (
        0..ROOTS.len(),
        proptest::option::of(0..CHILDREN.len()),
        0..VERBS.len(),
        any::<u8>(),
        proptest::option::of(any::<bool>()),
        proptest::option::of(prop::collection::vec("X-[A-Z][a-z]{0,3}", 0..3)),
        proptest::option::of(0..CONTENT_TYPES.len()),
    )
        .prop_map(|(root, child, verb, handler, require_auth, headers, content_type)| Declaration {
            root,
            child,
            verb,
            handler,
            require_auth,
            headers,
            content_type,
        })
}

fn chain_level() -> impl Strategy<Value = (Option<bool>, Option<Vec<String>>)> {
    (proptest::option::of(any::<bool>()), proptest::option::of(prop::collection::vec("[A-Z][a-z]{0,4}", 0..3)))
}

proptest! {
    #[test]
    fn merge_is_last_writer_wins(
        a in prop::collection::vec(declaration(), 0..8),
        b in prop::collection::vec(declaration(), 0..8),
    ) {
        let config_a = build(&a, "a");
        let config_b = build(&b, "b");

        let mut expected = routes(&RouteCompiler::new(&config_a).compile().unwrap());
        expected.extend(routes(&RouteCompiler::new(&config_b).compile().unwrap()));

        let merged = config_a.merge(config_b);
        let actual = routes(&RouteCompiler::new(&merged).compile().unwrap());

        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn leaf_override_always_wins(
        levels in prop::collection::vec(chain_level(), 1..5),
        leaf_auth in any::<bool>(),
        leaf_headers in prop::collection::vec("[A-Z][a-z]{0,4}", 0..3),
    ) {
        let leaf = MethodConfig::handler("leaf")
            .requires(Requirements::new().require_auth(leaf_auth).required_headers(leaf_headers.clone()));

        let mut node = PathNode::new().method("GET", leaf);
        for (depth, (auth, headers)) in levels.iter().enumerate().rev() {
            let mut requirements = Requirements::new();
            requirements.require_auth = *auth;
            requirements.required_headers = headers.clone();
            node = PathNode::new().requires(requirements).path(format!("/l{depth}"), node);
        }
        let config = RouteConfig::new().path("/", node);

        let table = RouteCompiler::new(&config).compile().unwrap();
        prop_assert_eq!(table.len(), 1);
        let route = &table.routes()[0];

        let mut expected_headers: Vec<String> = vec![];
        for header in &leaf_headers {
            if !expected_headers.contains(header) {
                expected_headers.push(header.clone());
            }
        }
        prop_assert_eq!(route.requirements().require_auth, leaf_auth);
        prop_assert_eq!(&route.requirements().required_headers, &expected_headers);

        let overrides = Requirements::new().require_auth(leaf_auth).required_headers(leaf_headers);
        let resolved: RequirementSet = resolve_requirements(&config, route.path(), &overrides);
        prop_assert_eq!(route.requirements(), &resolved);
    }
}
