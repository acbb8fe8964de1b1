use overlay_translator_rust::geom::Point;
use overlay_translator_rust::{group_nearby_text, TextFragment};

fn fragment(text: &str, x: f32, y: f32, w: f32, h: f32) -> TextFragment {
    TextFragment {
        description: text.to_string(),
        quad: [
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ],
    }
}

#[test]
fn clustering_groups_snapshot() {
    // Row one holds a narrow pair; row two straddles two bubbles.
    let fragments = vec![
        fragment("A", 100.0, 0.0, 100.0, 20.0),
        fragment("B", 300.0, 2.0, 100.0, 20.0),
        fragment("L", 0.0, 60.0, 100.0, 20.0),
        fragment("R", 900.0, 60.0, 100.0, 20.0),
    ];
    let groups = group_nearby_text(&fragments, 1000.0, 0.61);
    let texts: Vec<Vec<String>> = groups
        .iter()
        .map(|group| {
            group
                .fragments
                .iter()
                .map(|fragment| fragment.description.clone())
                .collect()
        })
        .collect();

    insta::assert_json_snapshot!(texts, @r###"
    [
      [
        "A",
        "B"
      ],
      [
        "L"
      ],
      [
        "R"
      ]
    ]
    "###);
}
