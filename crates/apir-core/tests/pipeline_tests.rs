use std::collections::HashSet;

use apir_core::error::TransformError;
use apir_core::ir::{HttpMethod, IrSpec, TypeIr};
use apir_core::parse;
use apir_core::parse::spec::OpenApiSpec;
use apir_core::transform::usage::{SchemaUsage, UsageAnalyzer};
use apir_core::transform::{self, FilterRule, RequiredMode, TransformOptions};

const BOOKSTORE: &str = include_str!("fixtures/bookstore.yaml");
const WIDGETS: &str = include_str!("fixtures/widgets.json");

const LD: &str = "application/ld+json";
const JSONAPI: &str = "application/vnd.api+json";
const JSON: &str = "application/json";

fn bookstore() -> OpenApiSpec {
    parse::from_yaml(BOOKSTORE).unwrap()
}

fn all_families() -> TransformOptions {
    TransformOptions {
        families: vec![LD.into(), JSONAPI.into(), JSON.into()],
        ..Default::default()
    }
}

fn run(spec: &OpenApiSpec, options: &TransformOptions) -> IrSpec {
    transform::transform(spec, options).unwrap()
}

fn string_or_null() -> TypeIr {
    TypeIr::Union(vec![TypeIr::String, TypeIr::Null])
}

#[test]
fn bookstore_identifiers() {
    let ir = run(&bookstore(), &all_families());
    insta::assert_yaml_snapshot!(ir.identifiers, @r"
    Author-book.read: AuthorBookReadVndApiJson
    Author.jsonld-book.read: AuthorBookRead
    Book-book.read: BookBookReadVndApiJson
    Book-book.write: BookBookWriteJson
    Book.jsonapi-book.read: BookBookReadVndApiJson2
    Book.jsonld-book.read: BookBookRead
    Book.jsonld-book.write: BookBookWrite
    BookStatus: BookStatus
    Review.jsonld-book.read: ReviewBookRead
    ");
}

#[test]
fn bookstore_models() {
    let ir = run(&bookstore(), &all_families());
    let names: Vec<&str> = ir.models.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "AuthorBookRead",
            "AuthorBookReadVndApiJson",
            "BookBookRead",
            "BookBookReadVndApiJson",
            "BookBookReadVndApiJson2",
            "BookBookWrite",
            "BookBookWriteJson",
            "ReviewBookRead",
        ]
    );

    // Flattened onto the protocol base; envelope stripped.
    let book = ir.model("BookBookRead").unwrap();
    assert_eq!(book.source, "Book.jsonld-book.read");
    assert!(book.extends.is_empty());
    assert!(book.extends_marker);
    let props: Vec<&str> = book.props.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(props, vec!["title", "isbn", "status", "author", "reviews"]);
    assert!(!book.prop("title").unwrap().optional);
    assert_eq!(book.prop("isbn").unwrap().ty, string_or_null());
    assert_eq!(
        book.prop("status").unwrap().ty,
        TypeIr::Union(vec![
            TypeIr::Literal("draft".into()),
            TypeIr::Literal("published".into()),
            TypeIr::Null,
        ])
    );
    assert_eq!(book.prop("author").unwrap().ty, TypeIr::Ref("AuthorBookRead".into()));
    assert_eq!(
        book.prop("reviews").unwrap().ty,
        TypeIr::Array(Box::new(TypeIr::Ref("ReviewBookRead".into())))
    );
    assert_eq!(book.imports, vec!["AuthorBookRead", "ReviewBookRead"]);

    let author = ir.model("AuthorBookRead").unwrap();
    assert_eq!(author.imports, vec!["BookBookRead"]);

    let review = ir.model("ReviewBookRead").unwrap();
    assert!(review.prop("@id").is_none());
    assert!(review.extends_marker);
    assert_eq!(review.prop("rating").unwrap().ty, TypeIr::Number);
    assert_eq!(
        review.prop("metadata").unwrap().ty,
        TypeIr::Map(Box::new(TypeIr::String))
    );

    // JSON:API document: `links` and `meta` are envelope.
    let document = ir.model("BookBookReadVndApiJson2").unwrap();
    assert_eq!(document.props.len(), 1);
    assert_eq!(document.props[0].name, "data");
    assert_eq!(document.imports, vec!["BookBookReadVndApiJson"]);

    let write = ir.model("BookBookWrite").unwrap();
    assert!(!write.extends_marker);
    assert_eq!(write.prop("author").unwrap().ty, string_or_null());
}

#[test]
fn bookstore_endpoints() {
    let ir = run(&bookstore(), &all_families());
    assert_eq!(ir.endpoints.len(), 5);

    let list = ir.endpoint(HttpMethod::Get, "/books").unwrap();
    assert_eq!(list.operation_id.as_deref(), Some("api_books_get_collection"));
    let query: Vec<(&str, bool)> = list
        .query
        .iter()
        .map(|q| (q.name.as_str(), q.required))
        .collect();
    assert_eq!(query, vec![("page", false), ("title", false)]);
    let content_types: Vec<Option<&str>> = list
        .responses
        .iter()
        .map(|r| r.content_type.as_deref())
        .collect();
    assert_eq!(content_types, vec![Some(LD), Some(JSONAPI), Some(JSON)]);
    assert_eq!(
        list.imports,
        vec!["BookBookRead", "BookBookReadVndApiJson", "BookBookReadVndApiJson2"]
    );

    let create = ir.endpoint(HttpMethod::Post, "/books").unwrap();
    let body = create.request_body.as_ref().unwrap();
    assert!(body.required);
    let body_types: Vec<&str> = body.content.iter().map(|c| c.content_type.as_str()).collect();
    assert_eq!(body_types, vec![LD, JSON]);
    assert_eq!(create.responses.len(), 1);
    assert_eq!(create.responses[0].status, "201");

    let patch = ir.endpoint(HttpMethod::Patch, "/books/{id}").unwrap();
    assert!(patch.request_body.is_none());
    assert_eq!(patch.responses.len(), 1);

    let delete = ir.endpoint(HttpMethod::Delete, "/books/{id}").unwrap();
    assert_eq!(delete.responses.len(), 1);
    assert!(delete.responses[0].ty.is_none());

    // Path parameters are not query parameters.
    let get = ir.endpoint(HttpMethod::Get, "/books/{id}").unwrap();
    assert!(get.query.is_empty());
}

#[test]
fn single_family_selection() {
    let spec = bookstore();
    let options = TransformOptions::default();
    let ir = run(&spec, &options);
    let sources: Vec<&str> = ir.models.iter().map(|m| m.source.as_str()).collect();
    assert_eq!(
        sources,
        vec![
            "Author.jsonld-book.read",
            "Book.jsonld-book.read",
            "Book.jsonld-book.write",
            "Review.jsonld-book.read",
        ]
    );

    let list = ir.endpoint(HttpMethod::Get, "/books").unwrap();
    assert_eq!(list.responses.len(), 1);
    let Some(TypeIr::Object(page)) = &list.responses[0].ty else {
        panic!("expected inline collection object");
    };
    assert_eq!(
        page.prop("hydra:member").unwrap().ty,
        TypeIr::Array(Box::new(TypeIr::Ref("BookBookRead".into())))
    );
}

#[test]
fn closure_is_idempotent() {
    let spec = bookstore();
    let analyzer = UsageAnalyzer::new(&spec, "Hydra");
    let families: Vec<String> = vec![LD.into(), JSONAPI.into(), JSON.into()];
    let once = analyzer.collect_usage(&families);
    assert_eq!(analyzer.expand_closure(once.clone()), once);

    for name in spec.catalog().unwrap().keys() {
        let mut seeds = SchemaUsage::new();
        seeds.insert(name.clone(), 0);
        let closure = analyzer.expand_closure(seeds);
        assert_eq!(analyzer.expand_closure(closure.clone()), closure, "{name}");
    }
}

#[test]
fn identifiers_are_unique() {
    let spec = bookstore();
    for families in [vec![LD], vec![JSON, LD], vec![JSONAPI, JSON, LD], vec![JSON, JSONAPI]] {
        let options = TransformOptions {
            families: families.iter().map(|f| f.to_string()).collect(),
            schemas: vec!["Unused".into(), "ConstraintViolation.jsonld".into()],
            ..Default::default()
        };
        let ir = run(&spec, &options);
        let mut seen = HashSet::new();
        for (raw, identifier) in ir.identifiers.iter() {
            assert!(seen.insert(identifier), "{raw} -> {identifier} duplicated");
        }
    }
}

#[test]
fn merge_patch_never_modeled() {
    let spec = bookstore();
    let options = TransformOptions {
        schemas: vec!["Book.jsonMergePatch-book.write".into()],
        ..all_families()
    };
    let ir = run(&spec, &options);
    assert!(ir.models.iter().all(|m| !m.source.contains("MergePatch")));
    assert!(ir.identifiers.get("Book.jsonMergePatch-book.write").is_none());
}

#[test]
fn required_mode_all() {
    let spec = parse::from_json(WIDGETS).unwrap();
    let options = TransformOptions {
        families: vec![JSON.into()],
        required_mode: RequiredMode::All,
        ..Default::default()
    };
    let ir = run(&spec, &options);
    let widget = ir.model("Widget").unwrap();
    for prop in &widget.props {
        assert!(prop.optional, "{}", prop.name);
        assert!(prop.ty.is_nullable(), "{}", prop.name);
    }
    assert_eq!(
        widget.prop("id").unwrap().ty,
        TypeIr::Union(vec![TypeIr::Number, TypeIr::Null])
    );
}

#[test]
fn scenario_simple_entity() {
    let spec = parse::from_json(WIDGETS).unwrap();
    let options = TransformOptions {
        families: vec![JSON.into()],
        ..Default::default()
    };
    let ir = run(&spec, &options);
    assert_eq!(ir.models.len(), 1);
    let widget = &ir.models[0];
    assert_eq!(widget.name, "Widget");
    assert_eq!(widget.props.len(), 2);
    assert_eq!(widget.props[0].name, "id");
    assert!(!widget.props[0].optional);
    assert_eq!(widget.props[0].ty, TypeIr::Number);
    assert_eq!(widget.props[1].name, "label");
    assert!(widget.props[1].optional);
    assert!(widget.props[1].ty.same_shape(&string_or_null()));

    let get = ir.endpoint(HttpMethod::Get, "/widgets/{id}").unwrap();
    assert_eq!(get.responses[0].ty, Some(TypeIr::Ref("Widget".into())));
    assert_eq!(get.imports, vec!["Widget"]);
}

#[test]
fn scenario_naming_collision() {
    let doc = r##"
openapi: "3.1.0"
info: { title: Widgets, version: "1" }
paths:
  /widgets:
    get:
      responses:
        "200":
          content:
            ld:
              schema: { $ref: "#/components/schemas/Widget.ld-read" }
            jsonapi:
              schema: { $ref: "#/components/schemas/Widget.jsonapi-read" }
components:
  schemas:
    Widget.ld-read:
      type: object
      properties:
        name: { type: string }
    Widget.jsonapi-read:
      type: object
      properties:
        data: { type: object }
"##;
    let spec = parse::from_yaml(doc).unwrap();
    let options = TransformOptions {
        families: vec!["ld".into(), "jsonapi".into()],
        ..Default::default()
    };
    let ir = run(&spec, &options);
    assert_eq!(ir.identifiers.get("Widget.ld-read"), Some("WidgetRead"));
    assert_eq!(ir.identifiers.get("Widget.jsonapi-read"), Some("WidgetReadJsonapi"));
}

#[test]
fn scenario_dangling_reference() {
    let doc = r##"
openapi: "3.0.3"
info: { title: T, version: "1" }
paths:
  /gadgets:
    get:
      responses:
        "200":
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Gadget" }
components:
  schemas:
    Gadget:
      type: object
      properties:
        owner: { $ref: "#/components/schemas/NotInCatalog" }
"##;
    let spec = parse::from_yaml(doc).unwrap();
    let options = TransformOptions {
        families: vec![JSON.into()],
        ..Default::default()
    };
    let ir = run(&spec, &options);
    let gadget = ir.model("Gadget").unwrap();
    assert_eq!(gadget.prop("owner").unwrap().ty, TypeIr::Any);
    assert!(gadget.imports.is_empty());
}

#[test]
fn scenario_unrecognized_shapes() {
    let doc = r##"
openapi: "3.1.0"
info: { title: T, version: "1" }
paths:
  /widgets:
    get:
      parameters:
        - { name: page, in: query, schema: { type: integer } }
        - { name: sig, in: querystring, schema: { type: string } }
      responses:
        "200":
          content:
            application/json:
              schema: { $ref: "#/components/schemas/W" }
components:
  schemas:
    W:
      type: object
      required: [id]
      properties:
        id: { type: integer }
        upload: { type: file }
        anything: true
        nothing: { type: array, items: false }
"##;
    let spec = parse::from_yaml(doc).unwrap();
    let options = TransformOptions {
        families: vec![JSON.into()],
        ..Default::default()
    };
    let ir = run(&spec, &options);
    let w = ir.model("W").unwrap();
    assert_eq!(w.props.len(), 4);
    assert_eq!(w.prop("id").unwrap().ty, TypeIr::Number);
    assert!(!w.prop("id").unwrap().optional);
    assert_eq!(w.prop("upload").unwrap().ty, TypeIr::Any);
    assert_eq!(w.prop("anything").unwrap().ty, TypeIr::Any);
    assert_eq!(
        w.prop("nothing").unwrap().ty,
        TypeIr::Array(Box::new(TypeIr::Any))
    );

    let endpoint = ir.endpoint(HttpMethod::Get, "/widgets").unwrap();
    let query: Vec<&str> = endpoint.query.iter().map(|q| q.name.as_str()).collect();
    assert_eq!(query, vec!["page"]);
}

#[test]
fn filters_keep_dependencies() {
    let spec = bookstore();
    let options = TransformOptions {
        include: vec![FilterRule::pattern(r"^Book\.jsonld-book\.read$").unwrap()],
        ..Default::default()
    };
    let ir = run(&spec, &options);
    let sources: Vec<&str> = ir.models.iter().map(|m| m.source.as_str()).collect();
    assert_eq!(
        sources,
        vec![
            "Author.jsonld-book.read",
            "Book.jsonld-book.read",
            "Review.jsonld-book.read",
        ]
    );
}

#[test]
fn filters_selecting_nothing_fail() {
    let spec = bookstore();
    let options = TransformOptions {
        exclude: vec![FilterRule::predicate(|_| true)],
        ..Default::default()
    };
    let err = transform::transform(&spec, &options).unwrap_err();
    assert!(matches!(err, TransformError::EmptySelection { .. }));
    assert_eq!(
        err.to_string(),
        "filters selected no schemas for families [application/ld+json]"
    );
}

#[test]
fn ir_serializes_to_json() {
    let spec = parse::from_json(WIDGETS).unwrap();
    let options = TransformOptions {
        families: vec![JSON.into()],
        ..Default::default()
    };
    let ir = run(&spec, &options);
    let json = serde_json::to_value(&ir).unwrap();
    assert_eq!(json["identifiers"]["Widget"], "Widget");
    assert_eq!(json["models"][0]["props"][0]["type"]["kind"], "number");
    assert_eq!(json["endpoints"][0]["method"], "GET");
    assert_eq!(json["endpoints"][0]["responses"][0]["type"]["value"], "Widget");
}
