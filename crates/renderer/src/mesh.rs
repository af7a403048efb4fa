//! CPU mesh paired with its device-side storage.

use engine_core::mesh::MeshData;

use crate::sink::{BufferedSize, MeshSink, Topology, UploadKind};

/// Mesh arrays plus the sink holding their uploaded copy.
///
/// `buffered` remembers the element counts of the last upload. [`Mesh::update`] compares
/// the current arrays against it to choose between an in-place write and a reallocation,
/// so callers can update every frame without tracking sizes themselves.
///
/// In-place updates only resend vertices. Edits through [`Mesh::data_mut`] must keep the
/// index array as uploaded; [`Mesh::set_data`] may replace it freely.
pub struct Mesh<S: MeshSink> {
    data: MeshData,
    sink: S,
    buffered: Option<BufferedSize>,
    index_count: u32,
    /// Set by `set_data`; the next `update` reallocates so the new indices are uploaded.
    indices_stale: bool,
}

impl<S: MeshSink> Mesh<S> {
    /// Wrap `data` without uploading it.
    pub fn new(data: MeshData, sink: S) -> Self {
        Self {
            data,
            sink,
            buffered: None,
            index_count: 0,
            indices_stale: false,
        }
    }

    /// Wrap and upload in one step.
    pub fn buffered(data: MeshData, sink: S) -> Self {
        let mut mesh = Self::new(data, sink);
        mesh.buffer();
        mesh
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Mutable access to the arrays. Vertex changes reach the sink on the next
    /// `buffer`/`update`; index changes only on the next `buffer`.
    pub fn data_mut(&mut self) -> &mut MeshData {
        &mut self.data
    }

    /// Replace both arrays. The next `update` reallocates unless the indices are unchanged.
    pub fn set_data(&mut self, data: MeshData) {
        self.indices_stale |= data.indices != self.data.indices;
        self.data = data;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Sizes of the last upload, `None` before the first `buffer`.
    pub fn buffered_size(&self) -> Option<BufferedSize> {
        self.buffered
    }

    /// Index count the next draw will submit.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Full upload into freshly allocated storage.
    ///
    /// # Panics
    /// If the index count does not fit the `u32` draw range.
    pub fn buffer(&mut self) -> UploadKind {
        let Ok(index_count) = u32::try_from(self.data.indices.len()) else {
            panic!(
                "Mesh::buffer called with {} indices, more than a u32 draw can address",
                self.data.indices.len()
            );
        };
        let size = BufferedSize::of(&self.data.vertices, &self.data.indices);
        self.sink.allocate(&self.data.vertices, &self.data.indices);
        self.buffered = Some(size);
        self.index_count = index_count;
        self.indices_stale = false;
        UploadKind::Reallocated
    }

    /// Push the current arrays to the sink, in place when the sizes still match the last
    /// upload and through [`Mesh::buffer`] otherwise.
    ///
    /// # Panics
    /// If the mesh was never buffered.
    pub fn update(&mut self) -> UploadKind {
        let Some(buffered) = self.buffered else {
            panic!("Mesh::update called before the mesh was ever buffered");
        };

        let size = BufferedSize::of(&self.data.vertices, &self.data.indices);
        if size != buffered {
            log::info!(
                "Mesh size changed ({} -> {} vertices), reallocating",
                buffered.vertices,
                size.vertices
            );
            return self.buffer();
        }
        if self.indices_stale {
            log::debug!("Mesh indices replaced at the same size, reallocating");
            return self.buffer();
        }

        self.sink.write(&self.data.vertices);
        UploadKind::InPlace
    }

    pub fn bind(&self, pass: &mut S::Pass<'_>) {
        self.sink.bind(pass);
    }

    /// # Panics
    /// If the mesh has no indices uploaded.
    pub fn draw(&self, pass: &mut S::Pass<'_>, topology: Topology) {
        assert!(self.index_count > 0, "Mesh::draw called with zero indices");
        self.sink.draw(pass, topology, self.index_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{DrawLog, MemorySink};
    use engine_core::mesh::BasicVertex;

    fn grid(n: u32, y: f32) -> MeshData {
        let mut data = MeshData::new();
        for z in 0..n {
            for x in 0..n {
                data.vertices.push(BasicVertex::new(
                    [x as f32, y + (x * z) as f32, z as f32],
                    [x as f32, z as f32],
                    [0.0, 1.0, 0.0],
                ));
            }
        }
        for z in 0..n - 1 {
            for x in 0..n - 1 {
                let tl = z * n + x;
                let bl = tl + n;
                data.indices.extend_from_slice(&[tl, bl, tl + 1, tl + 1, bl, bl + 1]);
            }
        }
        data
    }

    #[test]
    fn update_reuses_storage_when_sizes_match() {
        let mut mesh = Mesh::buffered(grid(4, 0.0), MemorySink::new());
        assert_eq!(mesh.sink().allocations(), 1);

        *mesh.data_mut() = grid(4, 3.0);
        assert_eq!(mesh.update(), UploadKind::InPlace);
        assert_eq!(mesh.update(), UploadKind::InPlace);
        assert_eq!(mesh.sink().allocations(), 1);
        assert_eq!(mesh.sink().writes(), 2);
    }

    #[test]
    fn update_reallocates_once_on_resize() {
        let mut mesh = Mesh::buffered(grid(4, 0.0), MemorySink::new());
        mesh.set_data(grid(6, 0.0));
        assert_eq!(mesh.update(), UploadKind::Reallocated);
        assert_eq!(mesh.buffered_size().unwrap().vertices, 36);

        // Subsequent same-size updates take the fast path again.
        assert_eq!(mesh.update(), UploadKind::InPlace);
        assert_eq!(mesh.sink().allocations(), 2);
        assert_eq!(mesh.index_count(), 5 * 5 * 6);
    }

    #[test]
    fn incremental_update_matches_fresh_upload() {
        let target = grid(5, 7.5);

        let fresh = Mesh::buffered(target.clone(), MemorySink::new());

        let mut incremental = Mesh::buffered(grid(5, 0.0), MemorySink::new());
        incremental.set_data(target);
        incremental.update();

        assert_eq!(fresh.sink().vertex_bytes(), incremental.sink().vertex_bytes());
        assert_eq!(fresh.sink().indices(), incremental.sink().indices());
    }

    #[test]
    fn in_place_update_sends_only_vertices() {
        let mut mesh = Mesh::buffered(grid(4, 0.0), MemorySink::new());
        let uploaded = mesh.sink().indices().to_vec();

        // Vertex edits go through the fast path; index edits made through `data_mut`
        // are not resent by it.
        let data = mesh.data_mut();
        data.vertices[5].position[1] = 9.0;
        data.indices.swap(0, 1);
        assert_eq!(mesh.update(), UploadKind::InPlace);
        assert_eq!(mesh.sink().vertices()[5].position[1], 9.0);
        assert_eq!(mesh.sink().indices(), &uploaded[..]);
        assert_eq!(mesh.sink().allocations(), 1);
    }

    #[test]
    fn replaced_indices_reallocate_at_same_size() {
        let mut mesh = Mesh::buffered(grid(4, 0.0), MemorySink::new());
        let mut data = grid(4, 0.0);
        data.indices.reverse();
        let reversed = data.indices.clone();

        mesh.set_data(data);
        assert_eq!(mesh.update(), UploadKind::Reallocated);
        assert_eq!(mesh.sink().indices(), &reversed[..]);
        assert_eq!(mesh.update(), UploadKind::InPlace);
        assert_eq!(mesh.sink().allocations(), 2);
    }

    #[test]
    fn draw_records_topology_and_count() {
        let mesh = Mesh::buffered(grid(3, 0.0), MemorySink::new());
        let mut log = DrawLog::default();
        mesh.bind(&mut log);
        mesh.draw(&mut log, Topology::Lines);
        assert_eq!(log.calls.len(), 1);
        assert_eq!(log.calls[0].topology, Topology::Lines);
        assert_eq!(log.calls[0].index_count, 24);
    }

    #[test]
    #[should_panic(expected = "before the mesh was ever buffered")]
    fn update_before_buffer_panics() {
        let mut mesh = Mesh::new(grid(3, 0.0), MemorySink::new());
        mesh.update();
    }

    #[test]
    #[should_panic(expected = "zero indices")]
    fn drawing_empty_mesh_panics() {
        let mesh = Mesh::buffered(MeshData::new(), MemorySink::new());
        let mut log = DrawLog::default();
        mesh.bind(&mut log);
        mesh.draw(&mut log, Topology::Triangles);
    }
}
