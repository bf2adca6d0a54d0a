use ergen_core::semantic::{Cardinality, Direction, KeyKind};
use ergen_parser::{error::ErrorCode, parse, parse_with_warnings};

#[test]
fn test_order_system_diagram() {
    let source = r#"
        erDiagram
            CUSTOMER ||--o{ ORDER : places
            ORDER ||--|{ LINE-ITEM : contains
            CUSTOMER }|..|{ DELIVERY-ADDRESS : uses
            CUSTOMER {
                string name
                string custNumber PK
                string sector
            }
            ORDER {
                int orderNumber PK
                string deliveryAddress FK "ship-to"
            }
    "#;

    let diagram = parse(source).expect("Failed to parse");

    let names: Vec<&str> = diagram.entities().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec!["CUSTOMER", "ORDER", "LINE-ITEM", "DELIVERY-ADDRESS"]
    );

    let relationships = diagram.relationships();
    assert_eq!(relationships.len(), 3);
    assert_eq!(relationships[1].right_cardinality(), Cardinality::OneOrMore);
    assert!(!relationships[2].is_identifying());
    assert!(relationships[2].is_many_to_many());

    let order = diagram.entity("ORDER").expect("ORDER entity");
    assert_eq!(order.attributes().len(), 2);
    assert!(order.attributes()[0].is_primary_key());
    assert_eq!(order.attributes()[1].keys(), &[KeyKind::Foreign]);
    assert_eq!(order.attributes()[1].comment(), Some("ship-to"));
}

#[test]
fn test_quoted_names_and_labels() {
    let source = r#"
    erDiagram
        "Line Item" }o--|| PRODUCT : "refers to"
        p["Product Catalog"] {
            string[] tags
        }
    "#;

    let diagram = parse(source).expect("Failed to parse");

    assert!(diagram.entity("Line Item").is_some());
    assert_eq!(diagram.relationships()[0].label(), "refers to");

    let catalog = diagram.entity("p").expect("aliased entity");
    assert_eq!(catalog.display_name(), "Product Catalog");
    assert_eq!(catalog.attributes()[0].ty(), "string[]");
}

#[test]
fn test_direction_and_comments() {
    let source = r#"
    %% generated for the school domain
    erDiagram
        direction LR
        STUDENT }o--o{ COURSE : enrolls
    "#;

    let diagram = parse(source).expect("Failed to parse");
    assert_eq!(diagram.direction(), Some(Direction::LeftRight));
}

#[test]
fn test_canonical_output_parses_back() {
    let source = r#"
    erDiagram
        TEACHER ||--o{ COURSE : teaches
        TEACHER {
            int id PK
            string full_name "given and family name"
        }
    "#;

    let diagram = parse(source).expect("Failed to parse");
    let reparsed = parse(&diagram.to_string()).expect("Canonical markup should parse");

    assert_eq!(diagram, reparsed);
}

#[test]
fn test_rejects_other_diagram_types() {
    let err = parse("graph TD\n    A --> B").unwrap_err();

    assert!(
        err.diagnostics()
            .iter()
            .any(|d| matches!(d.code(), Some(ErrorCode::E002) | Some(ErrorCode::E102)))
    );
}

#[test]
fn test_rejects_code_fences() {
    let err = parse("```mermaid\nerDiagram\n    A ||--o{ B : has\n```").unwrap_err();
    assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E002));
}

#[test]
fn test_word_cardinalities() {
    let source = r#"
    erDiagram
        CAR 1 to zero or more NAMED-DRIVER : allows
        PERSON only one optionally to 1+ ADDRESS : "lives at"
        BOOK Many(1) TO One or Zero SHELF : "sits on"
    "#;

    let diagram = parse(source).expect("Failed to parse");
    let relationships = diagram.relationships();

    assert_eq!(relationships[0].left(), "CAR");
    assert_eq!(relationships[0].left_cardinality(), Cardinality::ExactlyOne);
    assert_eq!(relationships[0].right_cardinality(), Cardinality::ZeroOrMore);
    assert!(relationships[0].is_identifying());
    assert_eq!(relationships[0].right(), "NAMED-DRIVER");

    assert_eq!(relationships[1].left_cardinality(), Cardinality::ExactlyOne);
    assert_eq!(relationships[1].right_cardinality(), Cardinality::OneOrMore);
    assert!(!relationships[1].is_identifying());

    assert_eq!(relationships[2].left_cardinality(), Cardinality::OneOrMore);
    assert_eq!(relationships[2].right_cardinality(), Cardinality::ZeroOrOne);
}

#[test]
fn test_word_cardinality_names_stay_entities() {
    let source = "erDiagram\n    one ||--o{ many : has\n    CUSTOMER\n    one 1 to many ORDER : places";

    let diagram = parse(source).expect("Failed to parse");

    assert!(diagram.entity("one").is_some());
    assert!(diagram.entity("many").is_some());
    assert_eq!(diagram.relationships().len(), 2);
    assert_eq!(diagram.relationships()[1].left(), "one");
}

#[test]
fn test_alternative_non_identifying_lines() {
    let diagram = parse("erDiagram\n    A ||.-o{ B : has\n    C }|-.|{ D : uses").unwrap();

    assert!(diagram.relationships().iter().all(|r| !r.is_identifying()));
}

#[test]
fn test_accessibility_statements() {
    let source = r#"
    erDiagram
        accTitle: Order system
        accDescr {
            Customers place orders.
        }
        CUSTOMER ||--o{ ORDER : places
    "#;

    let diagram = parse(source).expect("Failed to parse");

    assert_eq!(diagram.accessible_title(), Some("Order system"));
    assert_eq!(diagram.accessible_description(), Some("Customers place orders."));
    assert_eq!(diagram.relationships().len(), 1);

    let reparsed = parse(&diagram.to_string()).expect("Canonical markup should parse");
    assert_eq!(diagram, reparsed);
}

#[test]
fn test_attribute_words_with_asterisk_and_parentheses() {
    let source = r#"
    erDiagram
        ORDER {
            int *id PK
            varchar(255) note
        }
    "#;

    let diagram = parse(source).expect("Failed to parse");
    let order = diagram.entity("ORDER").unwrap();

    assert_eq!(order.attributes()[0].name(), "*id");
    assert_eq!(order.attributes()[1].ty(), "varchar(255)");
}

#[test]
fn test_attribute_words_are_not_entity_names() {
    assert!(parse("erDiagram\n    *ORDER ||--o{ B : has").is_err());
    assert!(parse("erDiagram\n    A(x) ||--o{ B : has").is_err());
}

#[test]
fn test_rejects_parenthesized_annotations() {
    assert!(parse("erDiagram\n    A ||--o{ B : has (primary)").is_err());
}

#[test]
fn test_rejects_missing_label() {
    let err = parse("erDiagram\n    A ||--o{ B").unwrap_err();
    assert_eq!(err.diagnostics()[0].code(), Some(ErrorCode::E101));
}

#[test]
fn test_warnings_do_not_fail_parse() {
    let source = "erDiagram\n    A {\n        int id PK, PK\n    }";

    let (diagram, warnings) = parse_with_warnings(source).expect("Warnings only");

    assert_eq!(diagram.entity("A").unwrap().attributes()[0].keys(), &[KeyKind::Primary]);
    assert_eq!(warnings.len(), 1);
}
