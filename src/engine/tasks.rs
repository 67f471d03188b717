// src/engine/tasks.rs
//
// Async facade over ImagePipeline.
//
// Each call runs the synchronous operation on tokio's blocking pool. With a
// cancellation token attached, a call returns `Cancelled` as soon as the token
// fires; the blocking work still runs to completion in the background, and
// its decode bindings are released by their guards as usual.

use crate::engine::api::ImagePipeline;
use crate::engine::color::ColorSample;
use crate::engine::common::EngineResult;
use crate::engine::geometry::Size;
use crate::engine::metadata::ImageMetadata;
use crate::engine::resource::ImageResource;
use crate::engine::surface::{ImageSurfaceFactory, SurfaceFactory};
use crate::engine::validation::ValidationResult;
use crate::error::CanvasError;
use crate::ops::{CollageOptions, CropOptions, MimeType, ResizeOptions, WatermarkOptions};
use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cloneable handle that runs pipeline operations off the async executor.
#[derive(Debug)]
pub struct AsyncPipeline<F = ImageSurfaceFactory> {
    inner: Arc<ImagePipeline<F>>,
    cancel: Option<CancellationToken>,
}

impl<F> Clone for AsyncPipeline<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: self.cancel.clone(),
        }
    }
}

impl<F> From<ImagePipeline<F>> for AsyncPipeline<F> {
    fn from(pipeline: ImagePipeline<F>) -> Self {
        Self {
            inner: Arc::new(pipeline),
            cancel: None,
        }
    }
}

impl<F> From<Arc<ImagePipeline<F>>> for AsyncPipeline<F> {
    fn from(inner: Arc<ImagePipeline<F>>) -> Self {
        Self { inner, cancel: None }
    }
}

impl<F: SurfaceFactory + 'static> AsyncPipeline<F> {
    pub fn new(pipeline: ImagePipeline<F>) -> Self {
        Self::from(pipeline)
    }

    /// A handle sharing this pipeline whose calls race `token`.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: Some(token),
        }
    }

    pub fn pipeline(&self) -> &Arc<ImagePipeline<F>> {
        &self.inner
    }

    async fn run<T, W>(&self, operation: &'static str, work: W) -> EngineResult<T>
    where
        T: Send + 'static,
        W: FnOnce(&ImagePipeline<F>) -> EngineResult<T> + Send + 'static,
    {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(CanvasError::cancelled());
        }

        let pipeline = Arc::clone(&self.inner);
        let handle = tokio::task::spawn_blocking(move || work(&pipeline));
        let joined = match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(operation, "cancelled; blocking work left to finish in background");
                    return Err(CanvasError::cancelled());
                }
                joined = handle => joined,
            },
            None => handle.await,
        };
        joined.map_err(from_join_error)?
    }

    // Validation is cheap and pure; no need to hop threads.
    pub fn validate(&self, file: Option<&ImageResource>) -> ValidationResult {
        self.inner.validate(file)
    }

    pub async fn resize(&self, resource: ImageResource, options: ResizeOptions) -> EngineResult<ImageResource> {
        self.run("resize", move |p| p.resize(&resource, &options)).await
    }

    pub async fn thumbnail(&self, resource: ImageResource, size: u32) -> EngineResult<ImageResource> {
        self.run("thumbnail", move |p| p.thumbnail(&resource, size)).await
    }

    pub async fn compress(&self, resource: ImageResource, quality: f32) -> EngineResult<ImageResource> {
        self.run("compress", move |p| p.compress(&resource, quality)).await
    }

    pub async fn crop(&self, resource: ImageResource, options: CropOptions) -> EngineResult<ImageResource> {
        self.run("crop", move |p| p.crop(&resource, &options)).await
    }

    pub async fn convert_format(&self, resource: ImageResource, target: MimeType) -> EngineResult<ImageResource> {
        self.run("convert", move |p| p.convert_format(&resource, target)).await
    }

    pub async fn collage(
        &self,
        images: Vec<ImageResource>,
        options: CollageOptions,
    ) -> EngineResult<ImageResource> {
        self.run("collage", move |p| p.collage(&images, &options)).await
    }

    pub async fn watermark(
        &self,
        resource: ImageResource,
        text: String,
        options: WatermarkOptions,
    ) -> EngineResult<ImageResource> {
        self.run("watermark", move |p| p.watermark(&resource, &text, &options))
            .await
    }

    pub async fn dominant_colors(&self, resource: ImageResource, count: usize) -> EngineResult<Vec<ColorSample>> {
        self.run("dominant_colors", move |p| p.dominant_colors(&resource, count))
            .await
    }

    pub async fn dimensions(&self, resource: ImageResource) -> EngineResult<Size> {
        self.run("dimensions", move |p| p.dimensions(&resource)).await
    }

    pub async fn metadata(&self, resource: ImageResource) -> EngineResult<ImageMetadata> {
        self.run("metadata", move |p| p.metadata(&resource)).await
    }
}

fn from_join_error(err: JoinError) -> CanvasError {
    if err.is_cancelled() {
        return CanvasError::cancelled();
    }
    let payload = err.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(%detail, "pipeline task panicked");
    CanvasError::internal_panic(format!("task panicked: {detail}"))
}
