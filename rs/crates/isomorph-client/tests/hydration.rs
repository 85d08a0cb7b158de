//! Server render → in-memory document → hydrate → mutate → patch.

use std::sync::Arc;

use isomorph_client::{ClientError, Dispatch, Dom, HydrationClient, MemoryDom, Mount, MountPoint, NodeId, SharedMount};
use isomorph_dom::{Attributes, ParseError, PatchOp, ViewNode};
use isomorph_render_html::{RenderRequest, ServerRenderer};
use isomorph_state::DecodeError;
use isomorph_template::{Syntax, TemplateError, TemplateSet};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ViewState {
    items: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OtherState {
    items: Vec<String>,
    selected: u32,
}

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Items</title></head>
<body>
  {{ mount }}
  <form id="newItemForm"><input name="item" type="text"><button type="submit">Add</button></form>
</body>
</html>"#;

const LIST: &str = "<ul>[% for item in items %]<li>[[ item ]]</li>[% endfor %]</ul>";
/// Valid up to three items; a fourth leaves a `<p>` unclosed.
const UNCLOSED_AFTER_THREE: &str = "<ul>[% for item in items %]<li>[[ item ]]</li>[% endfor %][% if items|length > 3 %]<p>[% endif %]</ul>";
/// Valid up to three items; a fourth prints an undefined variable.
const UNDEFINED_AFTER_THREE: &str = "<ul>[% for item in items %]<li>[[ item ]]</li>[% endfor %][% if items|length > 3 %][[ overflow ]][% endif %]</ul>";
const KEYED: &str = r#"<ul>[% for item in items %]<li data-key="[[ item ]]">[[ item ]]</li>[% endfor %]</ul>"#;

fn initial() -> ViewState {
    ViewState {
        items: vec!["First Item".into(), "Second Item".into(), "Third Item".into()],
    }
}

fn render(list: &str, state: &ViewState) -> String {
    let views = TemplateSet::from_sources(Syntax::Server, [("index/index.html", PAGE), ("index/index.tmpl", list)]).unwrap();
    ServerRenderer::new(Arc::new(views))
        .render(&RenderRequest {
            page: "index/index.html",
            mount_id: "list",
            templates: &["index/index.tmpl"],
            state,
            context: &(),
        })
        .unwrap()
}

fn serve(list: &str, state: &ViewState) -> MemoryDom {
    MemoryDom::parse_document(&render(list, state)).unwrap()
}

fn point() -> MountPoint {
    MountPoint::new("list", ["index/index.tmpl"])
}

fn hydrate(dom: &MemoryDom) -> Mount<ViewState, MemoryDom> {
    HydrationClient::new(dom.clone()).hydrate(&point()).unwrap()
}

fn li(text: &str) -> ViewNode {
    ViewNode::element("li", Attributes::new(), vec![ViewNode::text(text)])
}

fn items_of(mount: &Mount<ViewState, MemoryDom>) -> Vec<NodeId> {
    let ul = mount.dom().child(mount.root(), 0).unwrap();
    mount.dom().children(ul)
}

fn texts(mount: &Mount<ViewState, MemoryDom>) -> Vec<String> {
    items_of(mount).into_iter().map(|id| mount.dom().snapshot(id).unwrap().text_content()).collect()
}

#[test]
fn test_hydrate_reads_without_writing() {
    let dom = serve(LIST, &initial());
    let before = dom.to_html();
    let mount = hydrate(&dom);

    assert_eq!(mount.state(), &initial());
    assert_eq!(mount.baseline(), &dom.content(*mount.root()));
    assert_eq!(texts(&mount), initial().items);
    assert_eq!(dom.mutations(), 0);
    assert_eq!(dom.to_html(), before);
}

#[test]
fn test_append_is_one_insert() {
    let dom = serve(LIST, &initial());
    let mut mount = hydrate(&dom);
    let before = items_of(&mount);

    let patch = mount.update(|s| s.items.push("Fourth Item".into())).unwrap();

    assert_eq!(
        patch.ops(),
        &[PatchOp::InsertNode {
            parent: vec![0],
            index: 3,
            node: li("Fourth Item"),
        }]
    );
    let after = items_of(&mount);
    assert_eq!(after[..3], before[..]);
    assert_eq!(texts(&mount), vec!["First Item", "Second Item", "Third Item", "Fourth Item"]);
    assert_eq!(mount.baseline(), &dom.content(*mount.root()));
}

#[test]
fn test_remove_middle_is_one_remove() {
    let dom = serve(LIST, &initial());
    let mut mount = hydrate(&dom);
    let before = items_of(&mount);

    let patch = mount.update(|s| {
        s.items.remove(1);
    })
    .unwrap();

    assert_eq!(patch.ops(), &[PatchOp::RemoveNode { path: vec![0, 1] }]);
    assert_eq!(items_of(&mount), vec![before[0], before[2]]);
    assert_eq!(texts(&mount), vec!["First Item", "Third Item"]);
    assert_eq!(dom.sweep(), 2);
    assert_eq!(texts(&mount), vec!["First Item", "Third Item"]);
}

#[test]
fn test_truncated_state_fails_hydration() {
    let html = render(LIST, &initial());
    let open = html.find(r#"data-for="list">"#).unwrap() + r#"data-for="list">"#.len();
    let close = open + html[open..].find("</script>").unwrap();
    let payload = &html[open..close];
    let tampered = format!("{}{}{}", &html[..open], &payload[..payload.len() / 2], &html[close..]);

    let dom = MemoryDom::parse_document(&tampered).unwrap();
    let before = dom.to_html();
    let err = HydrationClient::new(dom.clone()).hydrate::<ViewState>(&point()).unwrap_err();

    assert!(matches!(err, ClientError::Decode(DecodeError::Truncated)), "{err}");
    assert_eq!(dom.mutations(), 0);
    assert_eq!(dom.to_html(), before);
    let list = dom.element_by_id("list").unwrap();
    assert!(dom.inner_html(&list).contains("<li>Second Item</li>"));
}

#[test]
fn test_shape_mismatch_fails_hydration() {
    let dom = serve(LIST, &initial());
    let err = HydrationClient::new(dom).hydrate::<OtherState>(&point()).unwrap_err();
    assert!(matches!(err, ClientError::Decode(DecodeError::ShapeMismatch(_))), "{err}");
}

#[test]
fn test_missing_containers() {
    let dom = serve(LIST, &initial());
    let client = HydrationClient::new(dom);
    let err = client
        .hydrate::<ViewState>(&MountPoint::new("list", ["index/other.tmpl"]))
        .unwrap_err();
    assert!(matches!(err, ClientError::MissingTemplate(ref n) if n == "index/other.tmpl"));
    let err = client
        .hydrate::<ViewState>(&MountPoint::new("grid", ["index/index.tmpl"]))
        .unwrap_err();
    assert!(matches!(err, ClientError::MissingState(ref m) if m == "grid"));
    let err = client
        .hydrate::<ViewState>(&MountPoint::new("list", Vec::<String>::new()))
        .unwrap_err();
    assert!(matches!(err, ClientError::NoTemplates(_)));
}

#[test]
fn test_keyed_reorder_keeps_nodes() {
    let dom = serve(KEYED, &initial());
    let mut mount = hydrate(&dom);
    let before = items_of(&mount);

    let patch = mount.update(|s| s.items.reverse()).unwrap();

    assert!(patch.iter().all(|op| matches!(op, PatchOp::MoveNode { .. })), "{patch:?}");
    let after = items_of(&mount);
    assert_eq!(after, before.iter().rev().copied().collect::<Vec<_>>());
    assert_eq!(texts(&mount), vec!["Third Item", "Second Item", "First Item"]);
}

#[test]
fn test_keyed_insert_keeps_nodes() {
    let dom = serve(KEYED, &initial());
    let mut mount = hydrate(&dom);
    let before = items_of(&mount);

    mount.update(|s| s.items.insert(0, "Zeroth Item".into())).unwrap();

    let after = items_of(&mount);
    assert_eq!(after.len(), 4);
    assert_eq!(after[1..], before[..]);
}

#[test]
fn test_external_edit_marks_stale_then_recovers() {
    let dom = serve(LIST, &initial());
    let mut mount = hydrate(&dom);
    let ul = dom.child(mount.root(), 0).unwrap();
    dom.remove_child(&ul, 1).unwrap();
    dom.remove_child(&ul, 1).unwrap();

    let err = mount.update(|s| s.items.push("Fourth Item".into())).unwrap_err();
    assert!(matches!(err, ClientError::Patch(_)), "{err}");
    assert!(mount.is_stale());

    mount.reconcile().unwrap();
    assert!(!mount.is_stale());
    assert_eq!(texts(&mount), vec!["First Item", "Second Item", "Third Item", "Fourth Item"]);
    assert_eq!(mount.baseline(), &dom.content(*mount.root()));
}

#[test]
fn test_unreadable_live_markup_is_fatal() {
    let dom = serve(LIST, &initial());
    let mut mount = hydrate(&dom);
    let root = *mount.root();
    dom.remove_child(&root, 0).unwrap();
    let bogus = dom
        .create_node(&ViewNode::element("1ul", Attributes::new(), Vec::new()))
        .unwrap();
    dom.insert_child(&root, 0, &bogus).unwrap();

    assert!(matches!(mount.update(|s| s.items.push("x".into())), Err(ClientError::Patch(_))));
    let err = mount.reconcile().unwrap_err();
    assert!(matches!(err, ClientError::Stale { ref mount, .. } if mount == "list"), "{err}");
}

#[test]
fn test_reentrant_dispatch_is_queued() {
    let dom = serve(LIST, &initial());
    let shared = SharedMount::new(hydrate(&dom));
    let inner = shared.clone();

    let outcome = shared
        .dispatch(move |s: &mut ViewState| {
            s.items.push("Fourth Item".into());
            let nested = inner.dispatch(|s: &mut ViewState| s.items.push("Fifth Item".into())).unwrap();
            assert_eq!(nested, Dispatch::Queued);
            assert!(inner.with(|_| ()).is_none());
        })
        .unwrap();

    let Dispatch::Applied(patch) = outcome else {
        panic!("expected the outer dispatch to apply");
    };
    assert_eq!(
        patch.ops(),
        &[
            PatchOp::InsertNode {
                parent: vec![0],
                index: 3,
                node: li("Fourth Item"),
            },
            PatchOp::InsertNode {
                parent: vec![0],
                index: 4,
                node: li("Fifth Item"),
            },
        ]
    );
    assert_eq!(shared.pending(), 0);
    assert_eq!(shared.with(|m| m.state().items.len()), Some(5));
}

fn assert_render_failure_leaves_dom(list: &str, check: impl Fn(&ClientError) -> bool) {
    let dom = serve(list, &initial());
    let mut mount = hydrate(&dom);
    let before_html = dom.to_html();
    let before_baseline = mount.baseline().clone();

    let err = mount.update(|s| s.items.push("Fourth Item".into())).unwrap_err();
    assert!(check(&err), "{err}");
    assert_eq!(dom.mutations(), 0);
    assert_eq!(dom.to_html(), before_html);
    assert_eq!(mount.baseline(), &before_baseline);
    assert!(!mount.is_stale());

    let patch = mount
        .update(|s| {
            s.items.pop();
            s.items[0] = "Renamed".into();
        })
        .unwrap();
    assert_eq!(
        patch.ops(),
        &[PatchOp::SetText {
            path: vec![0, 0, 0],
            content: "Renamed".into(),
        }]
    );
    assert_eq!(texts(&mount), vec!["Renamed", "Second Item", "Third Item"]);
    assert_eq!(mount.baseline(), &dom.content(*mount.root()));
}

#[test]
fn test_malformed_render_touches_nothing() {
    assert_render_failure_leaves_dom(UNCLOSED_AFTER_THREE, |err| {
        matches!(err, ClientError::Parse(ParseError::MismatchedClose { .. }))
    });
}

#[test]
fn test_template_failure_touches_nothing() {
    assert_render_failure_leaves_dom(UNDEFINED_AFTER_THREE, |err| {
        matches!(err, ClientError::Template(TemplateError::Execution { .. }))
    });
}

#[test]
fn test_dispatch_inside_with_is_rejected() {
    let dom = serve(LIST, &initial());
    let shared = SharedMount::new(hydrate(&dom));
    let inner = shared.clone();

    let nested = shared
        .with(|_| inner.dispatch(|s: &mut ViewState| s.items.push("Fourth Item".into())))
        .unwrap()
        .unwrap();

    assert_eq!(nested, Dispatch::Rejected);
    assert_eq!(shared.pending(), 0);
    assert_eq!(dom.mutations(), 0);
    assert_eq!(shared.with(|m| m.state().items.clone()), Some(initial().items));

    let outcome = shared.dispatch(|s: &mut ViewState| s.items.push("Fourth Item".into())).unwrap();
    assert!(matches!(outcome, Dispatch::Applied(ref p) if p.len() == 1), "{outcome:?}");
}
