//! Per-vertex influencer table.
//!
//! A compressed-row table: vertex `v` owns the run
//! `entries[offsets[v]..offsets[v] + counts[v]]`. Each entry is a signed
//! spring reference `(spring + 1) * sign`, `+` for the spring's first
//! endpoint and `-` for its second. The `+ 1` keeps spring 0 signed.

use crate::topology::PendingSpring;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfluencerTable {
    offsets: Vec<u32>,
    counts: Vec<u32>,
    entries: Vec<i32>,
}

impl InfluencerTable {
    /// Builds the table for `vertex_count` vertices.
    ///
    /// Entries of one vertex appear in spring order.
    pub fn build(vertex_count: usize, springs: &[PendingSpring]) -> Self {
        let mut counts = vec![0u32; vertex_count];
        for s in springs {
            counts[s.vertex0 as usize] += 1;
            counts[s.vertex1 as usize] += 1;
        }

        let mut offsets = Vec::with_capacity(vertex_count);
        let mut total = 0u32;
        for &c in &counts {
            offsets.push(total);
            total += c;
        }

        let mut entries = vec![0i32; total as usize];
        let mut cursor = offsets.clone();
        for (i, s) in springs.iter().enumerate() {
            let reference = i as i32 + 1;
            for (vertex, signed) in [(s.vertex0, reference), (s.vertex1, -reference)] {
                let slot = &mut cursor[vertex as usize];
                entries[*slot as usize] = signed;
                *slot += 1;
            }
        }

        Self {
            offsets,
            counts,
            entries,
        }
    }

    #[inline]
    pub fn offset(&self, vertex: usize) -> u32 {
        self.offsets[vertex]
    }

    #[inline]
    pub fn count(&self, vertex: usize) -> u32 {
        self.counts[vertex]
    }

    /// Signed spring references of `vertex`.
    pub fn run(&self, vertex: usize) -> &[i32] {
        let start = self.offsets[vertex] as usize;
        &self.entries[start..start + self.counts[vertex] as usize]
    }

    /// The flat entry array.
    pub fn entries(&self) -> &[i32] {
        &self.entries
    }

    /// Decodes an entry into `(spring index, sign)`.
    #[inline]
    pub fn decode(entry: i32) -> (usize, f32) {
        let spring = entry.unsigned_abs() as usize - 1;
        (spring, if entry > 0 { 1.0 } else { -1.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spring(v0: u32, v1: u32) -> PendingSpring {
        PendingSpring {
            vertex0: v0,
            vertex1: v1,
            stiffness: 1.0,
            rest_length_factor: 1.0,
        }
    }

    #[test]
    fn chain_of_three() {
        let table = InfluencerTable::build(3, &[spring(0, 1), spring(1, 2)]);
        assert_eq!(table.run(0), &[1]);
        assert_eq!(table.run(1), &[-1, 2]);
        assert_eq!(table.run(2), &[-2]);
        assert_eq!(table.offset(2), 3);
    }

    #[test]
    fn isolated_vertex_has_empty_run() {
        let table = InfluencerTable::build(3, &[spring(0, 2)]);
        assert_eq!(table.count(1), 0);
        assert!(table.run(1).is_empty());
    }

    #[test]
    fn decode_first_spring() {
        assert_eq!(InfluencerTable::decode(1), (0, 1.0));
        assert_eq!(InfluencerTable::decode(-1), (0, -1.0));
        assert_eq!(InfluencerTable::decode(-7), (6, -1.0));
    }
}
