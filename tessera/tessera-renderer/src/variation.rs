//! Pipeline variations: the discrete keys a pass specializes its shader on, and a
//! table holding one compiled object per key.

use std::marker::PhantomData;

/// A finite set of pipeline keys with a dense index.
pub trait Variation: Copy + Eq + std::fmt::Debug + 'static {
    fn all() -> &'static [Self];
    fn index(self) -> usize;
}

/// Sample count a tiled pass is specialized for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MsaaVariation {
    X1,
    X2,
    X4,
    X8,
}

impl MsaaVariation {
    pub const ALL: [MsaaVariation; 4] = [MsaaVariation::X1, MsaaVariation::X2, MsaaVariation::X4, MsaaVariation::X8];

    /// 1, 2 and 4 map to themselves; every other count (including 0, 3 and anything
    /// above 8) selects the 8-sample variation.
    pub fn from_sample_count(samples: u32) -> Self {
        match samples {
            1 => MsaaVariation::X1,
            2 => MsaaVariation::X2,
            4 => MsaaVariation::X4,
            _ => MsaaVariation::X8,
        }
    }

    pub fn sample_count(self) -> u32 {
        match self {
            MsaaVariation::X1 => 1,
            MsaaVariation::X2 => 2,
            MsaaVariation::X4 => 4,
            MsaaVariation::X8 => 8,
        }
    }

    pub fn is_multisampled(self) -> bool {
        self != MsaaVariation::X1
    }
}

impl Variation for MsaaVariation {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClearTargetKind {
    Texture,
    TextureArray,
    Buffer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClearDataKind {
    Float,
    Int,
}

/// Target kind, numeric kind and channel count of a clear pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClearVariation {
    target: ClearTargetKind,
    data: ClearDataKind,
    channels: u32,
}

impl ClearVariation {
    pub const COUNT: usize = 24;

    pub const ALL: [ClearVariation; Self::COUNT] = {
        let mut all = [ClearVariation {
            target: ClearTargetKind::Texture,
            data: ClearDataKind::Float,
            channels: 1,
        }; Self::COUNT];
        let mut i = 0;
        while i < Self::COUNT {
            all[i] = Self::from_index(i);
            i += 1;
        }
        all
    };

    const fn from_index(index: usize) -> Self {
        let target = match index / 8 {
            0 => ClearTargetKind::Texture,
            1 => ClearTargetKind::TextureArray,
            _ => ClearTargetKind::Buffer,
        };
        let data = if (index / 4) % 2 == 0 { ClearDataKind::Float } else { ClearDataKind::Int };
        ClearVariation {
            target,
            data,
            channels: (index % 4) as u32 + 1,
        }
    }

    /// A channel count outside 1..=4 selects the 1-channel variation.
    pub fn select(target: ClearTargetKind, data: ClearDataKind, channels: u32) -> Self {
        let channels = if (1..=4).contains(&channels) { channels } else { 1 };
        Self { target, data, channels }
    }

    pub fn target(self) -> ClearTargetKind {
        self.target
    }

    pub fn data(self) -> ClearDataKind {
        self.data
    }

    pub fn channels(self) -> u32 {
        self.channels
    }

    /// Storage texture format a texture variation writes. Three channel variations
    /// write four channel textures since there is no three channel storage format.
    pub fn storage_format(self) -> wgpu::TextureFormat {
        use wgpu::TextureFormat as F;
        match (self.data, self.channels) {
            (ClearDataKind::Float, 1) => F::R32Float,
            (ClearDataKind::Float, 2) => F::Rg32Float,
            (ClearDataKind::Float, _) => F::Rgba32Float,
            (ClearDataKind::Int, 1) => F::R32Sint,
            (ClearDataKind::Int, 2) => F::Rg32Sint,
            (ClearDataKind::Int, _) => F::Rgba32Sint,
        }
    }

    /// Channel count and numeric kind of a storage format the clear pass can write.
    pub fn for_format(format: wgpu::TextureFormat) -> Option<(ClearDataKind, u32)> {
        use wgpu::TextureFormat as F;
        Some(match format {
            F::R32Float => (ClearDataKind::Float, 1),
            F::Rg32Float => (ClearDataKind::Float, 2),
            F::Rgba32Float => (ClearDataKind::Float, 4),
            F::R32Sint => (ClearDataKind::Int, 1),
            F::Rg32Sint => (ClearDataKind::Int, 2),
            F::Rgba32Sint => (ClearDataKind::Int, 4),
            _ => return None,
        })
    }
}

impl Variation for ClearVariation {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn index(self) -> usize {
        let target = match self.target {
            ClearTargetKind::Texture => 0,
            ClearTargetKind::TextureArray => 1,
            ClearTargetKind::Buffer => 2,
        };
        let data = match self.data {
            ClearDataKind::Float => 0,
            ClearDataKind::Int => 1,
        };
        target * 8 + data * 4 + (self.channels as usize - 1)
    }
}

/// One `T` per variation of `V`, built up front. Lookup is a plain index.
pub struct VariationTable<V: Variation, T> {
    entries: Vec<T>,
    _marker: PhantomData<V>,
}

impl<V: Variation, T> VariationTable<V, T> {
    pub fn build(mut factory: impl FnMut(V) -> T) -> Self {
        let entries = V::all()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                debug_assert_eq!(v.index(), i, "variation {:?} out of order", v);
                factory(v)
            })
            .collect();
        Self {
            entries,
            _marker: PhantomData,
        }
    }

    pub fn try_build<E>(mut factory: impl FnMut(V) -> Result<T, E>) -> Result<Self, E> {
        let mut entries = Vec::with_capacity(V::all().len());
        for (i, &v) in V::all().iter().enumerate() {
            debug_assert_eq!(v.index(), i, "variation {:?} out of order", v);
            entries.push(factory(v)?);
        }
        Ok(Self {
            entries,
            _marker: PhantomData,
        })
    }

    pub fn get(&self, variation: V) -> &T {
        &self.entries[variation.index()]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (V, &T)> {
        V::all().iter().copied().zip(self.entries.iter())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn msaa_selection() {
        assert_eq!(MsaaVariation::from_sample_count(1), MsaaVariation::X1);
        assert_eq!(MsaaVariation::from_sample_count(2), MsaaVariation::X2);
        assert_eq!(MsaaVariation::from_sample_count(4), MsaaVariation::X4);
        for n in [8, 9, 16, u32::MAX, 3, 0] {
            assert_eq!(MsaaVariation::from_sample_count(n), MsaaVariation::X8);
        }
        for v in MsaaVariation::ALL {
            assert_eq!(MsaaVariation::from_sample_count(v.sample_count()), v);
        }
    }

    #[test]
    fn clear_index_is_bijection() {
        let indices: HashSet<usize> = ClearVariation::ALL.iter().map(|v| v.index()).collect();
        assert_eq!(indices.len(), ClearVariation::COUNT);
        assert!(indices.iter().all(|&i| i < ClearVariation::COUNT));
        for (i, v) in ClearVariation::ALL.iter().enumerate() {
            assert_eq!(v.index(), i);
        }
    }

    #[test]
    fn selection_is_total_and_deterministic() {
        let targets = [ClearTargetKind::Texture, ClearTargetKind::TextureArray, ClearTargetKind::Buffer];
        let kinds = [ClearDataKind::Float, ClearDataKind::Int];
        let mut seen = HashSet::new();
        for target in targets {
            for data in kinds {
                for channels in 1..=4 {
                    let v = ClearVariation::select(target, data, channels);
                    assert_eq!(v, ClearVariation::select(target, data, channels));
                    assert_eq!((v.target(), v.data(), v.channels()), (target, data, channels));
                    seen.insert(v);
                }
            }
        }
        assert_eq!(seen.len(), 24);
    }

    #[test]
    fn bad_channel_count_falls_back_to_one() {
        for channels in [0, 5, 17, u32::MAX] {
            let v = ClearVariation::select(ClearTargetKind::Buffer, ClearDataKind::Int, channels);
            assert_eq!(v, ClearVariation::select(ClearTargetKind::Buffer, ClearDataKind::Int, 1));
        }
    }

    #[test]
    fn storage_formats_round_trip_through_for_format() {
        for v in ClearVariation::ALL {
            let (data, channels) = ClearVariation::for_format(v.storage_format()).unwrap();
            assert_eq!(data, v.data());
            let expected = if v.channels() == 3 { 4 } else { v.channels() };
            assert_eq!(channels, expected);
        }
        assert!(ClearVariation::for_format(wgpu::TextureFormat::Bc1RgbaUnorm).is_none());
    }

    #[test]
    fn table_lookup_matches_factory() {
        let table = VariationTable::build(|v: ClearVariation| v.index() * 10);
        assert_eq!(table.len(), 24);
        for v in ClearVariation::ALL {
            assert_eq!(*table.get(v), v.index() * 10);
        }
        let msaa: VariationTable<MsaaVariation, u32> = VariationTable::build(|v: MsaaVariation| v.sample_count());
        assert_eq!(*msaa.get(MsaaVariation::from_sample_count(64)), 8);
    }
}
