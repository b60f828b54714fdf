use inlinemark::{InlineParser, Node, NodeValue, ReferenceMap, Tree, parse_inlines};

/// Every input parses. Two conservation checks apply to restricted alphabets:
/// brackets without destinations or definitions come back verbatim, and every
/// `*` ends up either as text or as one side of an emphasis pair.
#[test_fuzz::test_fuzz]
fn parse_target(data: String) {
    let mut references = ReferenceMap::new();
    let consumed = references.parse_definitions(&data);

    let mut tree = Tree::new();
    let paragraph = tree.create(NodeValue::Paragraph);
    InlineParser::new().parse(&mut tree, paragraph, &data[consumed..], &references);
    let nodes = tree.child_nodes(paragraph);
    let subject = data.trim_matches(|c: char| c <= ' ');

    if data.chars().all(|c| matches!(c, '[' | ']' | ' ' | 'a'..='z')) {
        assert_eq!(Node::Paragraph(nodes.clone()).plain_text(), subject, "input {:?}", data);
    }

    if data.chars().all(|c| matches!(c, '*' | ' ' | 'a'..='z')) {
        let stars_in_input = subject.chars().filter(|&c| c == '*').count();
        let accounted: usize = nodes.iter().map(stars_accounted_for).sum();
        assert_eq!(accounted, stars_in_input, "input {:?}", data);
    }
}

fn stars_accounted_for(node: &Node) -> usize {
    let own = match node {
        Node::Text(text) => text.chars().filter(|&c| c == '*').count(),
        Node::Emphasis(_) => 2,
        Node::Strong(_) => 4,
        _ => 0,
    };
    own + node.children().iter().map(stars_accounted_for).sum::<usize>()
}

#[test]
fn adversarial_inputs_parse() {
    let inputs = [
        "",
        "*",
        "]",
        "![",
        "\\",
        "`",
        "&",
        "<",
        "***",
        "_*_*_*",
        "[[[[[[[[[[",
        "]]]]]]]]]]",
        "[](",
        "[a](<",
        "[a](b \"",
        "*a **b ***c ****d",
        "a **** b ** c * d ***",
        "**_*_**_*_**",
        "[*a](b*)",
        "[a] [b]] [[c]",
        "![![![a](b)](c)](d)",
        "[a]: <b\n[a]",
        "<a href=\"\n\">",
        "`` ` `` `",
        "&#xFFFFFFFF; &#1114112; &#55296;",
        "é*ü*ß_ẞ_",
        "a  \n  \n\\\n",
        "\u{0}*\u{0}*",
    ];
    for input in inputs {
        parse_target(input.to_string());
    }

    let deep = "[".repeat(500) + &"*a".repeat(500) + &"]".repeat(500);
    parse_target(deep);
}

#[test]
fn deeply_nested_emphasis_converts_to_nodes() {
    let stars = "*".repeat(10_000);
    let mut level = parse_inlines(&format!("{stars}a{stars}"));

    // Unwrap one level at a time so the nested vectors are never dropped recursively
    let mut depth = 0;
    while let [Node::Strong(children)] = level.as_mut_slice() {
        level = std::mem::take(children);
        depth += 1;
    }
    assert_eq!(depth, 5_000);
    assert_eq!(level, vec![Node::Text("a".to_string())]);
}
