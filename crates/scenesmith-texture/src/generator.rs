//! The default generation collaborator: procedural maps on local disk.

use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use log::debug;

use scenesmith_editor::{GenerateError, TextureGenerator};
use scenesmith_recipe::hash::{derive_map_seed, request_cache_key};
use scenesmith_recipe::{GenerationRequest, MapSet};

use crate::png::{write_grayscale, write_rgb, PngConfig};
use crate::style::infer_style;
use crate::synth::synthesize;

/// Texture generator producing procedural checker/stone/metal map sets.
///
/// Output files are named after the request's cache key, so re-running the
/// same request finds its maps already on disk and skips the synthesis.
/// Same request, same bytes: synthesis is seeded and the PNG encoder uses
/// fixed settings.
#[derive(Debug, Clone)]
pub struct ProceduralGenerator {
    out_dir: PathBuf,
    config: PngConfig,
}

impl ProceduralGenerator {
    /// Generator writing maps under `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            config: PngConfig::default(),
        }
    }

    /// The output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn run(
        out_dir: &Path,
        config: &PngConfig,
        request: &GenerationRequest,
    ) -> Result<MapSet, GenerateError> {
        let key = request_cache_key(request);
        let stem = key.short();
        let path_for = |map: &str| out_dir.join(format!("{}_{}.png", stem, map));

        let albedo = path_for("albedo");
        let roughness = path_for("roughness");
        let metalness = path_for("metalness");
        let normal = path_for("normal");

        let all_exist = [&albedo, &roughness, &metalness, &normal]
            .iter()
            .all(|p| p.exists());
        if all_exist {
            debug!("maps for {} already on disk, skipping synthesis", stem);
        } else {
            let style = infer_style(&request.prompt);
            debug!(
                "synthesizing {} maps ({}x{}) for {}",
                style, request.size, request.size, stem
            );
            let seed = derive_map_seed(request.seed, style.as_str());
            let maps = synthesize(style, request.size, seed);

            std::fs::create_dir_all(out_dir).map_err(backend_error)?;
            write_rgb(&maps.albedo, &albedo, config).map_err(backend_error)?;
            write_grayscale(&maps.roughness, &roughness, config).map_err(backend_error)?;
            write_grayscale(&maps.metalness, &metalness, config).map_err(backend_error)?;
            write_grayscale(&maps.normal, &normal, config).map_err(backend_error)?;
        }

        Ok(MapSet {
            albedo: path_string(&albedo),
            normal: Some(path_string(&normal)),
            roughness: Some(path_string(&roughness)),
            metalness: Some(path_string(&metalness)),
        })
    }
}

impl TextureGenerator for ProceduralGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> BoxFuture<'static, Result<MapSet, GenerateError>> {
        let out_dir = self.out_dir.clone();
        let config = self.config.clone();
        let request = request.clone();
        async move { Self::run(&out_dir, &config, &request) }.boxed()
    }
}

fn backend_error(err: impl std::fmt::Display) -> GenerateError {
    GenerateError::Backend(err.to_string())
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use scenesmith_recipe::TargetSlotType;

    use super::*;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, 7, 64, TargetSlotType::Floor)
    }

    #[tokio::test]
    async fn generates_a_full_map_set_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ProceduralGenerator::new(dir.path());

        let maps = generator.generate(&request("mossy stone")).await.unwrap();
        for path in maps.paths() {
            assert!(Path::new(path).exists(), "missing {}", path);
        }
    }

    #[tokio::test]
    async fn same_request_produces_identical_bytes() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();

        let maps_a = ProceduralGenerator::new(dir_a.path())
            .generate(&request("mossy stone"))
            .await
            .unwrap();
        let maps_b = ProceduralGenerator::new(dir_b.path())
            .generate(&request("mossy stone"))
            .await
            .unwrap();

        let bytes_a = std::fs::read(&maps_a.albedo).unwrap();
        let bytes_b = std::fs::read(&maps_b.albedo).unwrap();
        assert_eq!(bytes_a, bytes_b);
    }

    #[tokio::test]
    async fn existing_maps_are_reused() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ProceduralGenerator::new(dir.path());
        let request = request("checker floor");

        let maps = generator.generate(&request).await.unwrap();
        let modified_before = std::fs::metadata(&maps.albedo).unwrap().modified().unwrap();

        let again = generator.generate(&request).await.unwrap();
        assert_eq!(maps, again);
        let modified_after = std::fs::metadata(&maps.albedo).unwrap().modified().unwrap();
        assert_eq!(modified_before, modified_after);
    }

    #[tokio::test]
    async fn different_prompts_land_in_different_files() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ProceduralGenerator::new(dir.path());

        let stone = generator.generate(&request("mossy stone")).await.unwrap();
        let metal = generator.generate(&request("chrome plate")).await.unwrap();
        assert_ne!(stone.albedo, metal.albedo);
    }
}
