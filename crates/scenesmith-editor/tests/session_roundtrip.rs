//! End-to-end session scenarios through the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use pretty_assertions::assert_eq;

use scenesmith_editor::{
    codec, EditorSession, GenerateError, GenerationCache, MapBinding, PreviewOutcome,
    TextureGenerator, UndoOutcome,
};
use scenesmith_recipe::{GenerationRequest, MapSet, TargetSlotType, Transform};

struct CountingGenerator {
    calls: Arc<AtomicUsize>,
}

impl CountingGenerator {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl TextureGenerator for CountingGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> BoxFuture<'static, Result<MapSet, GenerateError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let albedo = format!("{}.png", request.prompt.replace(' ', "_"));
        async move {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            Ok(MapSet::albedo_only(albedo))
        }
        .boxed()
    }
}

fn mossy_stone() -> GenerationRequest {
    GenerationRequest::new("mossy stone", 7, 1024, TargetSlotType::Floor)
}

#[test]
fn a_session_of_edits_fully_unwinds() {
    let mut session = EditorSession::new();
    let root = session.scene().root();
    let initial = codec::serialize(session.scene(), session.materials());

    let floor = session
        .add_node(root, Some("floor.mesh".into()), &[TargetSlotType::Floor])
        .unwrap();
    let prop = session
        .add_node(floor, Some("crate.mesh".into()), &[TargetSlotType::Object])
        .unwrap();
    session
        .set_transform(prop, Transform::at([0.5, 0.0, 2.0]))
        .unwrap();
    let slot = session.scene().node(floor).unwrap().slot_refs[0];
    session
        .apply_material(
            slot,
            MapBinding::Static {
                path: "wet_cobble.png".into(),
            },
        )
        .unwrap();
    session.commit_material(slot).unwrap();
    session.remove_node(prop).unwrap();

    let mut undone = 0;
    while session.undo().unwrap() == UndoOutcome::Done {
        undone += 1;
    }
    assert_eq!(undone, 6);
    assert_eq!(codec::serialize(session.scene(), session.materials()), initial);

    let mut redone = 0;
    while session.redo().unwrap() == UndoOutcome::Done {
        redone += 1;
    }
    assert_eq!(redone, 6);
    assert!(!session.scene().contains(prop));
    assert_eq!(
        session.materials().slot(slot).unwrap().committed,
        MapBinding::Static {
            path: "wet_cobble.png".into()
        }
    );
}

#[tokio::test]
async fn two_slots_one_generator_call() {
    let cache = Arc::new(GenerationCache::new());
    let mut session = EditorSession::with_cache(cache.clone());
    let root = session.scene().root();
    let a = session
        .add_node(root, None, &[TargetSlotType::Floor])
        .unwrap();
    let b = session
        .add_node(root, None, &[TargetSlotType::Floor])
        .unwrap();
    let slot_a = session.scene().node(a).unwrap().slot_refs[0];
    let slot_b = session.scene().node(b).unwrap().slot_refs[0];

    let generator = CountingGenerator::new();
    let first = session
        .request_preview(slot_a, mossy_stone(), &generator)
        .await
        .unwrap();
    let second = session
        .request_preview(slot_b, mossy_stone(), &generator)
        .await
        .unwrap();

    assert_eq!(first, PreviewOutcome::Applied);
    assert_eq!(second, PreviewOutcome::Applied);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        session.materials().effective(slot_a).unwrap(),
        session.materials().effective(slot_b).unwrap()
    );
}

#[tokio::test]
async fn recipe_reopens_into_an_equal_recipe() {
    let mut session = EditorSession::new();
    let root = session.scene().root();
    let floor = session
        .add_node(root, Some("floor.mesh".into()), &[TargetSlotType::Floor])
        .unwrap();
    let slot = session.scene().node(floor).unwrap().slot_refs[0];

    let generator = CountingGenerator::new();
    session
        .request_preview(slot, mossy_stone(), &generator)
        .await
        .unwrap();
    session.commit_material(slot).unwrap();

    let doc = codec::serialize(session.scene(), session.materials());
    let json = doc.to_json().unwrap();

    // Reopen sharing the same cache: the generated slot binds immediately.
    let reparsed = scenesmith_recipe::RecipeDoc::from_json(&json).unwrap();
    let mut reopened = EditorSession::with_cache(session.cache().clone());
    let import = codec::deserialize(&reparsed, reopened.cache()).unwrap();
    assert!(import.pending.is_empty());
    reopened.apply_import(import);

    let doc_again = codec::serialize(reopened.scene(), reopened.materials());
    assert_eq!(doc, doc_again);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}
