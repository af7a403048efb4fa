//! Destination for mesh uploads.
//!
//! A sink owns the device-side copy of one mesh. `allocate` establishes storage sized for the
//! given arrays; `write` overwrites the vertex storage in place and is only valid for an array
//! of the same length. Indices are only ever sent by `allocate`. [`crate::mesh::Mesh`] decides
//! which of the two to call.

use engine_core::mesh::BasicVertex;

/// How indices are assembled into primitives at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    /// Filled triangles.
    #[default]
    Triangles,
    /// Triangle edges only (wireframe).
    Lines,
}

/// Which upload path a `buffer`/`update` call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Fresh storage was allocated.
    Reallocated,
    /// Existing storage was overwritten in place.
    InPlace,
}

/// Element counts of the storage currently held by a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferedSize {
    pub vertices: usize,
    pub indices: usize,
}

impl BufferedSize {
    pub fn of(vertices: &[BasicVertex], indices: &[u32]) -> Self {
        Self {
            vertices: vertices.len(),
            indices: indices.len(),
        }
    }
}

pub trait MeshSink {
    /// Per-frame state that draws are recorded into.
    type Pass<'p>;

    /// Replace any previous storage with storage holding exactly these arrays.
    fn allocate(&mut self, vertices: &[BasicVertex], indices: &[u32]);

    /// Overwrite the current vertex storage, keeping the allocated indices. Callers
    /// guarantee the length matches the last `allocate`.
    fn write(&mut self, vertices: &[BasicVertex]);

    /// Make this mesh's buffers current in `pass`.
    fn bind(&self, pass: &mut Self::Pass<'_>);

    /// Draw the first `index_count` indices of the bound buffers.
    fn draw(&self, pass: &mut Self::Pass<'_>, topology: Topology, index_count: u32);
}

/// One recorded draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub sink: u64,
    pub topology: Topology,
    pub index_count: u32,
}

/// Pass type for [`MemorySink`]: records what would have been submitted.
#[derive(Debug, Default)]
pub struct DrawLog {
    pub bound: Option<u64>,
    pub calls: Vec<DrawCall>,
}

/// CPU-backed sink. Keeps the uploaded bytes so tests and headless runs can read back
/// exactly what a GPU buffer would contain.
#[derive(Debug, Default)]
pub struct MemorySink {
    id: u64,
    vertices: Vec<BasicVertex>,
    indices: Vec<u32>,
    allocations: usize,
    writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        static NEXT_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            ..Default::default()
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Vertex storage as raw bytes.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertices(&self) -> &[BasicVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of `allocate` calls so far.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Number of in-place `write` calls so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl MeshSink for MemorySink {
    type Pass<'p> = DrawLog;

    fn allocate(&mut self, vertices: &[BasicVertex], indices: &[u32]) {
        self.vertices = vertices.to_vec();
        self.indices = indices.to_vec();
        self.allocations += 1;
    }

    fn write(&mut self, vertices: &[BasicVertex]) {
        assert_eq!(vertices.len(), self.vertices.len(), "vertex write exceeds allocation");
        self.vertices.copy_from_slice(vertices);
        self.writes += 1;
    }

    fn bind(&self, pass: &mut DrawLog) {
        pass.bound = Some(self.id);
    }

    fn draw(&self, pass: &mut DrawLog, topology: Topology, index_count: u32) {
        assert_eq!(pass.bound, Some(self.id), "draw without bind");
        assert!(index_count as usize <= self.indices.len());
        pass.calls.push(DrawCall {
            sink: self.id,
            topology,
            index_count,
        });
    }
}
