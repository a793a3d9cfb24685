use std::fmt::Debug;

use rustc_hash::FxHashMap;
use tracing::{info, warn};

use crate::portal::PortalId;

pub const DEFAULT_RENDER_SCALE: f32 = 1.0;

/// Host-side allocator for the textures portal cameras render into.
pub trait FrameBufferProvider {
    type Handle: Copy + Eq + Debug;

    /// Returns `None` when the host cannot allocate; the portal then renders
    /// nothing until the next resize.
    fn acquire(&mut self, width: u32, height: u32) -> Option<Self::Handle>;

    fn release(&mut self, handle: Self::Handle);
}

pub fn scaled_dimension(dimension: u32, scale: f32) -> u32 {
    ((dimension.max(1) as f32) * scale).round().max(1.0) as u32
}

/// One render target per portal, sized from the output resolution.
pub struct RenderTargets<F: FrameBufferProvider> {
    provider: F,
    slots: Vec<Option<F::Handle>>,
    output_width: u32,
    output_height: u32,
    render_scale: f32,
}

impl<F: FrameBufferProvider> RenderTargets<F> {
    pub fn new(provider: F, output_width: u32, output_height: u32, render_scale: f32) -> Self {
        Self {
            provider,
            slots: Vec::new(),
            output_width,
            output_height,
            render_scale,
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (
            scaled_dimension(self.output_width, self.render_scale),
            scaled_dimension(self.output_height, self.render_scale),
        )
    }

    /// Acquires a target for every portal slot up to `count` that lacks one.
    pub fn setup(&mut self, count: usize) {
        if self.slots.len() < count {
            self.slots.resize(count, None);
        }
        let (width, height) = self.target_size();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = acquire_logged(&mut self.provider, index, width, height);
            }
        }
    }

    /// Reallocates every target for a new output size. Old targets are
    /// released before their replacements are acquired. Returns false when
    /// the scaled size did not change.
    pub fn resize(&mut self, output_width: u32, output_height: u32) -> bool {
        let before = self.target_size();
        self.output_width = output_width;
        self.output_height = output_height;
        let (width, height) = self.target_size();
        if (width, height) == before {
            return false;
        }

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(handle) = slot.take() {
                self.provider.release(handle);
            }
            *slot = acquire_logged(&mut self.provider, index, width, height);
        }
        true
    }

    pub fn target(&self, portal: PortalId) -> Option<F::Handle> {
        self.slots.get(portal.index()).copied().flatten()
    }

    pub fn release_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(handle) = slot.take() {
                self.provider.release(handle);
            }
        }
    }

    pub fn provider(&self) -> &F {
        &self.provider
    }
}

fn acquire_logged<F: FrameBufferProvider>(
    provider: &mut F,
    index: usize,
    width: u32,
    height: u32,
) -> Option<F::Handle> {
    let handle = provider.acquire(width, height);
    match handle {
        Some(handle) => info!("Allocated {width}x{height} portal target {handle:?} for portal#{index}"),
        None => warn!("No {width}x{height} portal target available for portal#{index}; view disabled"),
    }
    handle
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameBufferId(pub u32);

/// In-memory provider that tracks live allocations, for headless runs.
#[derive(Debug, Default)]
pub struct HeadlessFrameBuffers {
    next_id: u32,
    live: FxHashMap<FrameBufferId, (u32, u32)>,
    capacity: Option<usize>,
    released: Vec<FrameBufferId>,
}

impl HeadlessFrameBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses allocations beyond `capacity` live buffers.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn size_of(&self, id: FrameBufferId) -> Option<(u32, u32)> {
        self.live.get(&id).copied()
    }

    pub fn released(&self) -> &[FrameBufferId] {
        &self.released
    }
}

impl FrameBufferProvider for HeadlessFrameBuffers {
    type Handle = FrameBufferId;

    fn acquire(&mut self, width: u32, height: u32) -> Option<FrameBufferId> {
        if self.capacity.is_some_and(|capacity| self.live.len() >= capacity) {
            return None;
        }
        let id = FrameBufferId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, (width, height));
        Some(id)
    }

    fn release(&mut self, handle: FrameBufferId) {
        if self.live.remove(&handle).is_some() {
            self.released.push(handle);
        }
    }
}
