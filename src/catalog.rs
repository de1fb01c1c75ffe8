use log::*;

use crate::{
    consts,
    driver::{Driver, RawStreamEntry},
    settings::{StreamFormat, StreamInfo, StreamKind},
    CamError, CamResult,
};

/// Snapshot of the color and depth resolutions supported by one device.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCatalog {
    device_index: Option<u32>,
    color: Vec<StreamInfo>,
    depth: Vec<StreamInfo>,
}

impl ResolutionCatalog {
    /// Queries the driver for the resolutions of `dev_index`.
    ///
    /// A driver failure yields an empty catalog, just like a device without modes.
    pub fn scan<D: Driver + ?Sized>(driver: &mut D, dev_index: u32) -> Self {
        let (color, depth) = driver
            .resolutions(dev_index, consts::MAX_STREAM_INFO_ENTRIES)
            .inspect_err(|e| warn!("Unable to list resolutions of device {dev_index} ({e})"))
            .unwrap_or_default();

        Self {
            device_index: Some(dev_index),
            color: Self::filter_entries(&color),
            depth: Self::filter_entries(&depth),
        }
    }

    /// Drops unused slots and assigns dense indices in scan order.
    fn filter_entries(raw: &[RawStreamEntry]) -> Vec<StreamInfo> {
        raw.iter()
            .take(consts::MAX_STREAM_INFO_ENTRIES)
            .enumerate()
            .filter(|(_, entry)| entry.width > 0)
            .enumerate()
            .map(|(index, (slot, entry))| StreamInfo {
                index,
                width: entry.width as u32,
                height: entry.height.max(0) as u32,
                format: if entry.is_mjpg {
                    StreamFormat::Mjpg
                } else {
                    StreamFormat::Yuyv
                },
                slot,
            })
            .collect()
    }

    pub fn is_stale_for(&self, dev_index: u32) -> bool {
        self.device_index != Some(dev_index)
    }

    pub fn color(&self) -> &[StreamInfo] {
        &self.color
    }

    pub fn depth(&self) -> &[StreamInfo] {
        &self.depth
    }

    /// Resolves a dense index into an entry, or fails with a configuration error.
    pub fn entry(&self, kind: StreamKind, index: usize) -> CamResult<&StreamInfo> {
        let entries = match kind {
            StreamKind::Color => &self.color,
            StreamKind::Depth => &self.depth,
        };

        entries.get(index).ok_or(CamError::InvalidResolutionIndex {
            kind,
            index,
            available: entries.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(width: i32, height: i32, is_mjpg: bool) -> RawStreamEntry {
        RawStreamEntry {
            width,
            height,
            is_mjpg,
        }
    }

    #[test]
    fn empty_slots_are_skipped_and_indices_stay_dense() {
        let raw = [
            entry(0, 0, false),
            entry(640, 480, false),
            entry(-1, 480, false),
            entry(1280, 720, true),
            entry(0, 720, true),
        ];

        let infos = ResolutionCatalog::filter_entries(&raw);

        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|info| info.width > 0));
        assert_eq!(infos.iter().map(|i| i.index).collect::<Vec<_>>(), [0, 1]);
        assert_eq!(infos.iter().map(|i| i.slot).collect::<Vec<_>>(), [1, 3]);
        assert_eq!(infos[1].format, StreamFormat::Mjpg);
    }

    #[test]
    fn entries_beyond_capacity_are_ignored() {
        let raw = vec![entry(320, 240, false); consts::MAX_STREAM_INFO_ENTRIES + 8];

        let infos = ResolutionCatalog::filter_entries(&raw);

        assert_eq!(infos.len(), consts::MAX_STREAM_INFO_ENTRIES);
    }

    #[test]
    fn unknown_index_is_a_configuration_error() {
        let catalog = ResolutionCatalog::default();

        assert!(catalog.is_stale_for(0));

        let err = catalog.entry(StreamKind::Depth, 0).unwrap_err();
        assert!(err.is_configuration());
    }
}
