#![forbid(unsafe_code)]

//! Integration tests: mount points rendering into a recording target.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use fritz2_core::{Flow, Observable, Patch, PatchStream};
use fritz2_harness::{RecordingTarget, TargetOp};
use fritz2_runtime::{
    ChildTarget, MountError, MountScope, MountState, RenderError, RenderErrorPolicy, Runtime, RuntimeConfig,
    Store, bind_list, bind_single,
};
use tracing::span;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

type Item = (char, u32);

fn ids(keys: &str) -> Vec<Item> {
    keys.chars().map(|c| (c, 0)).collect()
}

fn render_item(item: &Flow<Item>, _: &mut MountScope) -> Result<String, RenderError> {
    Ok(item.with(|(id, n)| format!("{id}{n}")))
}

// ============================================================================
// List mounts
// ============================================================================

#[test]
fn list_transition_issues_delete_move_insert() {
    let list = Observable::new(ids("abc"));
    let target = RecordingTarget::<String>::new();
    let _mount = bind_list(&list, |item: &Item| item.0, target.clone(), render_item);
    target.take_ops();

    list.set(ids("cad"));
    assert_eq!(
        target.take_ops(),
        vec![
            TargetOp::Remove { index: 1 },
            TargetOp::Move { from: 1, to: 0 },
            TargetOp::Insert {
                index: 2,
                child: "d0".to_string()
            },
        ]
    );
    assert_eq!(target.children(), vec!["c0", "a0", "d0"]);
}

#[test]
fn value_only_change_updates_item_without_structural_ops() {
    let list = Observable::new(ids("ab"));
    let target: RecordingTarget<String> = RecordingTarget::new();
    let latest_b = Rc::new(Cell::new(0));
    let seen = Rc::clone(&latest_b);
    let _mount = bind_list(
        &list,
        |item: &Item| item.0,
        target.clone(),
        move |item: &Flow<Item>, scope: &mut MountScope| {
            let seen = Rc::clone(&seen);
            scope.subscribe(item, move |(id, n): &Item| {
                if *id == 'b' {
                    seen.set(*n);
                }
            });
            render_item(item, scope)
        },
    );
    target.take_ops();

    list.set(vec![('a', 0), ('b', 5)]);
    assert!(target.ops().is_empty());
    assert_eq!(latest_b.get(), 5);
    assert_eq!(target.children(), vec!["a0", "b0"]);
}

#[test]
fn refused_insert_is_reported_and_healed_next_emission() {
    let list = Observable::new(ids("a"));
    let target = RecordingTarget::<String>::new();
    let failures = Rc::new(Cell::new(0));
    let mount = {
        let f = Rc::clone(&failures);
        fritz2_runtime::bind_list_with(
            &list,
            |item: &Item| item.0,
            target.clone(),
            fritz2_runtime::MountOptions::default().on_error(move |_| f.set(f.get() + 1)),
            render_item,
        )
    };

    target.refuse_next("insert");
    list.set(ids("ab"));
    assert_eq!(failures.get(), 1);
    assert_eq!(target.children(), vec!["a0"]);

    list.set(ids("abc"));
    assert_eq!(target.children(), vec!["a0", "b0", "c0"]);
    assert_eq!(mount.keys(), vec!['a', 'b', 'c']);
}

#[test]
fn refused_move_is_retried_within_the_same_emission() {
    let list = Observable::new(ids("abc"));
    let target = RecordingTarget::<String>::new();
    let mount = bind_list(&list, |item: &Item| item.0, target.clone(), render_item);

    target.refuse_next("move");
    list.set(ids("cbad"));
    assert_eq!(target.children(), vec!["c0", "b0", "a0", "d0"]);
    assert_eq!(mount.keys(), vec!['c', 'b', 'a', 'd']);
    assert_eq!(mount.error_count(), 1);
}

#[test]
fn disposing_list_mount_removes_children_last_first() {
    let list = Observable::new(ids("abc"));
    let target = RecordingTarget::<String>::new();
    let mount = bind_list(&list, |item: &Item| item.0, target.clone(), render_item);
    target.take_ops();

    mount.dispose().unwrap();
    assert_eq!(
        target.take_ops(),
        vec![
            TargetOp::Remove { index: 2 },
            TargetOp::Remove { index: 1 },
            TargetOp::Remove { index: 0 },
        ]
    );
    list.set(ids("xyz"));
    assert!(target.ops().is_empty());
    assert_eq!(mount.dispose(), Err(MountError::Disposed));
}

#[test]
fn patch_stream_drives_an_external_child_target() {
    let list = Observable::new(ids("abc"));
    let stream = PatchStream::new(&list, |item: &Item| item.0);
    let target = RecordingTarget::<char>::new();
    let sink = RefCell::new(target.clone());
    let _feed = stream.subscribe(move |batch: &Vec<Patch<Item, char>>| {
        let mut sink = sink.borrow_mut();
        for patch in batch {
            let applied = match patch {
                Patch::Insert { id, index, .. } => sink.insert_child(*index, *id),
                Patch::Delete { index, .. } => sink.remove_child(*index).map(drop),
                Patch::Move { from, to, .. } => sink.move_child(*from, *to),
            };
            applied.unwrap();
        }
    });
    assert_eq!(target.children(), vec!['a', 'b', 'c']);

    list.set(ids("cad"));
    assert_eq!(target.children(), vec!['c', 'a', 'd']);
}

// ============================================================================
// Single mounts and nesting
// ============================================================================

#[test]
fn nested_list_is_disposed_when_outer_content_is_replaced() {
    let page = Observable::new("inbox");
    let messages = Observable::new(ids("ab"));
    let rows = RecordingTarget::<String>::new();
    let outer_target = RecordingTarget::<String>::new();

    let (m, r) = (messages.clone(), rows.clone());
    let outer = bind_single(
        &page,
        outer_target.clone(),
        move |name: &&str, scope: &mut MountScope| {
            if *name == "inbox" {
                scope.adopt(bind_list(&m, |item: &Item| item.0, r.clone(), render_item));
            }
            Ok(name.to_string())
        },
    );
    assert_eq!(rows.children(), vec!["a0", "b0"]);
    assert_eq!(outer.scope_bindings(), 1);

    page.set("settings");
    assert!(rows.children().is_empty());
    assert_eq!(outer_target.content().as_deref(), Some("settings"));

    messages.set(ids("abc"));
    assert!(rows.children().is_empty());
    assert_eq!(messages.subscriber_count(), 0);
}

#[test]
fn single_mount_through_runtime_clears_on_refused_replace() {
    let rt = Runtime::with_config(
        RuntimeConfig::default().with_render_errors(RenderErrorPolicy::ClearAndContinue),
    )
    .unwrap();
    let title = Observable::new(String::from("one"));
    let target = RecordingTarget::<String>::new();
    let mount = rt.bind_single(&title, target.clone(), |t: &String, _: &mut MountScope| {
        Ok(t.clone())
    });

    target.refuse_next("replace");
    title.set("two".into());
    assert_eq!(target.content(), None);
    assert_eq!(mount.error_count(), 1);

    title.set("three".into());
    assert_eq!(target.content().as_deref(), Some("three"));
    assert_eq!(mount.state(), MountState::Bound);
}

#[test]
fn store_backed_list_renders_after_queue_drains() {
    let mut rt = Runtime::new().unwrap();
    let todos = rt.store(ids("ab")).unwrap();
    let target = RecordingTarget::<String>::new();
    let _mount = rt.bind_list(&todos.data(), |item: &Item| item.0, target.clone(), render_item);

    todos
        .handle(|mut list: Vec<Item>, id: char| {
            list.retain(|item| item.0 != id);
            list
        })
        .call('a')
        .unwrap();
    assert_eq!(target.children(), vec!["a0", "b0"]);
    rt.run_until_stalled();
    assert_eq!(target.children(), vec!["b0"]);
}

// ============================================================================
// Spans
// ============================================================================

#[derive(Clone, Default)]
struct SpanNames(Arc<Mutex<Vec<&'static str>>>);

impl<S: tracing::Subscriber> Layer<S> for SpanNames {
    fn on_new_span(&self, attrs: &span::Attributes<'_>, _id: &span::Id, _ctx: Context<'_, S>) {
        if let Ok(mut names) = self.0.lock() {
            names.push(attrs.metadata().name());
        }
    }
}

#[test]
fn store_updates_and_renders_open_spans() {
    let names = SpanNames::default();
    let subscriber = tracing_subscriber::registry().with(names.clone());

    tracing::subscriber::with_default(subscriber, || {
        let mut rt = Runtime::new().unwrap();
        let count = rt.store(0).unwrap();
        let target = RecordingTarget::<i32>::new();
        let _mount = bind_single(&count.data(), target, |n: &i32, _: &mut MountScope| Ok(*n));
        count.update().call(1).unwrap();
        rt.run_until_stalled();
    });

    let names = names.0.lock().unwrap().clone();
    assert_eq!(names.iter().filter(|n| **n == "store.update").count(), 1);
    assert_eq!(names.iter().filter(|n| **n == "mount.render").count(), 2);
}
