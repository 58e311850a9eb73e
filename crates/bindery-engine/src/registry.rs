// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Input registry: the ordered, append-only list of images and documents
// that one job assembles.

use std::collections::BTreeMap;

use bindery_core::error::{BinderyError, Result};
use bindery_core::{InputEntry, Position, RotationSpec};
use tracing::debug;

/// What is stored at one position. An image and a document may share a
/// position; the image is emitted first.
#[derive(Debug, Clone, Default)]
struct Slot {
    image: Option<InputEntry>,
    document: Option<InputEntry>,
}

/// Inputs of a single job, keyed by insertion position.
///
/// Positions start at 1 and come from one shared counter, so under normal
/// use there are no gaps.
#[derive(Debug, Clone, Default)]
pub struct InputRegistry {
    slots: BTreeMap<Position, Slot>,
    /// Highest position handed out so far.
    last: u32,
    rotation: Option<RotationSpec>,
    /// Set by `add_single_document_with_rotation`; closes the registry.
    single_document: bool,
}

impl InputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an image. `target_height` of `None` or `Some(0)` fills the page.
    pub fn add_image(&mut self, bytes: Vec<u8>, target_height: Option<u32>) -> Result<Position> {
        self.append(InputEntry::image(bytes, target_height))
    }

    /// Append a PDF whose pages are imported in order.
    pub fn add_document(&mut self, bytes: Vec<u8>) -> Result<Position> {
        self.append(InputEntry::document(bytes))
    }

    /// Make this a single-document job whose pages are all imported with the
    /// rotation that `rotation_code` maps to (see [`RotationSpec::from_code`]).
    ///
    /// Only valid on an empty registry, and closes it to further inputs.
    pub fn add_single_document_with_rotation(
        &mut self,
        bytes: Vec<u8>,
        rotation_code: i64,
    ) -> Result<Position> {
        if !self.is_empty() {
            return Err(BinderyError::InvalidJobSetup(
                "a rotated single-document job must be the job's only input".to_string(),
            ));
        }
        let position = self.append(InputEntry::document(bytes))?;
        self.rotation = RotationSpec::from_code(rotation_code);
        self.single_document = true;
        debug!(rotation_code, rotation = ?self.rotation, "Single-document job");
        Ok(position)
    }

    /// Number of positions, N. Positions run 1..=N.
    pub fn len(&self) -> u32 {
        self.last
    }

    pub fn is_empty(&self) -> bool {
        self.last == 0
    }

    /// Every position of the job in ascending order, including empty ones.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        (1..=self.last).map(Position)
    }

    /// Entries at `position`: the image first, then the document.
    pub fn entries_at(&self, position: Position) -> impl Iterator<Item = &InputEntry> {
        self.slots
            .get(&position)
            .into_iter()
            .flat_map(|slot| slot.image.iter().chain(slot.document.iter()))
    }

    /// Job-wide rotation, set only by the single-document path.
    pub fn rotation(&self) -> Option<RotationSpec> {
        self.rotation
    }

    /// Bytes of the document stored at `position`, if any.
    pub fn document_at(&self, position: Position) -> Option<&[u8]> {
        self.slots
            .get(&position)
            .and_then(|slot| slot.document.as_ref())
            .map(InputEntry::bytes)
    }

    /// Consume the registry, keeping only the document at `position`.
    pub fn into_document_at(mut self, position: Position) -> Option<Vec<u8>> {
        match self.slots.remove(&position)?.document? {
            InputEntry::Document { bytes } => Some(bytes),
            InputEntry::Image { .. } => None,
        }
    }

    fn append(&mut self, entry: InputEntry) -> Result<Position> {
        if self.single_document {
            return Err(BinderyError::InvalidJobSetup(
                "a rotated single-document job takes no further inputs".to_string(),
            ));
        }
        let position = Position(self.last + 1);
        self.place(position, entry);
        Ok(position)
    }

    /// Store `entry` at an explicit position, replacing an entry of the same
    /// kind. Positions skipped over stay empty.
    pub(crate) fn place(&mut self, position: Position, entry: InputEntry) {
        debug!(
            %position,
            kind = if entry.is_image() { "image" } else { "document" },
            bytes_len = entry.bytes().len(),
            "Input added"
        );
        let slot = self.slots.entry(position).or_default();
        if entry.is_image() {
            slot.image = Some(entry);
        } else {
            slot.document = Some(entry);
        }
        self.last = self.last.max(position.get());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_start_at_one_and_have_no_gaps() {
        let mut registry = InputRegistry::new();
        assert_eq!(registry.add_image(vec![1], None).unwrap(), Position(1));
        assert_eq!(registry.add_document(vec![2]).unwrap(), Position(2));
        assert_eq!(registry.add_image(vec![3], Some(120)).unwrap(), Position(3));

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.positions().collect::<Vec<_>>(),
            vec![Position(1), Position(2), Position(3)]
        );
    }

    #[test]
    fn image_comes_before_document_at_a_shared_position() {
        let mut registry = InputRegistry::new();
        registry.place(Position(1), InputEntry::document(vec![9]));
        registry.place(Position(1), InputEntry::image(vec![8], None));

        let kinds: Vec<bool> = registry
            .entries_at(Position(1))
            .map(InputEntry::is_image)
            .collect();
        assert_eq!(kinds, vec![true, false]);
    }

    #[test]
    fn empty_positions_still_count() {
        let mut registry = InputRegistry::new();
        registry.place(Position(3), InputEntry::document(vec![1]));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.entries_at(Position(2)).count(), 0);
    }

    #[test]
    fn rotation_path_sets_the_job_rotation() {
        let mut registry = InputRegistry::new();
        registry.add_single_document_with_rotation(vec![1], 6).unwrap();
        assert_eq!(registry.rotation(), Some(RotationSpec::Deg90));
        assert_eq!(registry.document_at(Position::FIRST), Some(&[1u8][..]));
    }

    #[test]
    fn unknown_rotation_code_means_no_rotation() {
        let mut registry = InputRegistry::new();
        registry.add_single_document_with_rotation(vec![1], 42).unwrap();
        assert_eq!(registry.rotation(), None);
    }

    #[test]
    fn rotation_path_requires_an_empty_registry() {
        let mut registry = InputRegistry::new();
        registry.add_document(vec![1]).unwrap();
        let err = registry
            .add_single_document_with_rotation(vec![2], 6)
            .unwrap_err();
        assert!(matches!(err, BinderyError::InvalidJobSetup(_)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.rotation(), None);
    }

    #[test]
    fn rotation_path_closes_the_registry() {
        let mut registry = InputRegistry::new();
        registry.add_single_document_with_rotation(vec![1], 3).unwrap();
        assert!(registry.add_image(vec![2], None).is_err());
        assert!(registry.add_document(vec![3]).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn into_document_at_skips_images() {
        let mut registry = InputRegistry::new();
        registry.add_image(vec![1], None).unwrap();
        assert_eq!(registry.clone().into_document_at(Position(1)), None);
        registry.add_document(vec![7, 7]).unwrap();
        assert_eq!(registry.into_document_at(Position(2)), Some(vec![7, 7]));
    }
}
