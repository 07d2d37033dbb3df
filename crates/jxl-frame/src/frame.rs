//! The per-frame DC/AC phase state machine (§4.13).
//!
//! Sections arrive addressed by *logical* id (after undoing the TOC
//! permutation) and may arrive out of order or duplicated; this state
//! machine tracks which logical sections have been consumed and rejects
//! duplicates without treating them as fatal.

use crate::header::FrameHeader;
use crate::toc::{FrameDimensions, Toc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    HeaderRead,
    TocRead,
    DcGroups,
    DcFinalized,
    AcGroups,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOutcome {
    Applied,
    Duplicate,
    /// Section index referred to a pass/group beyond this frame's TOC.
    Skipped,
}

/// Logical section addressing, mirroring `Toc`'s layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionId {
    DcGlobal,
    DcGroup(u32),
    AcGlobal,
    AcGroup { pass: u32, group: u32 },
}

pub struct FrameState {
    pub header: FrameHeader,
    pub dims: FrameDimensions,
    pub toc: Toc,
    phase: Phase,
    dc_global_done: bool,
    dc_groups_done: Vec<bool>,
    ac_global_done: bool,
    ac_groups_done: Vec<bool>,
}

impl FrameState {
    pub fn new(header: FrameHeader, dims: FrameDimensions, toc: Toc) -> Self {
        let num_dc = dims.num_dc_groups() as usize;
        let num_ac = (header.passes as usize) * dims.num_groups() as usize;
        Self {
            header,
            dims,
            toc,
            phase: Phase::TocRead,
            dc_global_done: false,
            dc_groups_done: vec![false; num_dc],
            ac_global_done: false,
            ac_groups_done: vec![false; num_ac],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn single_section(&self) -> bool {
        self.dims.num_groups() == 1 && self.header.passes == 1
    }

    /// Map a logical TOC index to its [`SectionId`].
    pub fn section_id(&self, logical_index: usize) -> Option<SectionId> {
        if self.single_section() {
            return if logical_index == 0 { Some(SectionId::DcGlobal) } else { None };
        }
        let num_dc = self.dims.num_dc_groups() as usize;
        let num_groups = self.dims.num_groups() as usize;
        if logical_index == 0 {
            Some(SectionId::DcGlobal)
        } else if logical_index <= num_dc {
            Some(SectionId::DcGroup((logical_index - 1) as u32))
        } else if logical_index == num_dc + 1 {
            Some(SectionId::AcGlobal)
        } else {
            let ac_index = logical_index - num_dc - 2;
            let total_ac = self.header.passes as usize * num_groups;
            if ac_index >= total_ac {
                return None;
            }
            Some(SectionId::AcGroup {
                pass: (ac_index / num_groups) as u32,
                group: (ac_index % num_groups) as u32,
            })
        }
    }

    /// Whether DC has been fully finalized, the precondition for AC-global
    /// and any AC-group to be processed (they may still arrive earlier and
    /// are reported [`SectionOutcome::Skipped`] for later retry).
    fn dc_ready(&self) -> bool {
        matches!(self.phase, Phase::DcFinalized | Phase::AcGroups | Phase::Finalized)
    }

    /// Record that logical section `logical_index` has been decoded.
    /// Does not itself decode bytes — callers slice `toc.sizes` /
    /// `toc.order` to find the physical bytes, decode them, then report
    /// the outcome here.
    ///
    /// Dependency rules (§4.13): AC-global is only processed once DC is
    /// finalized, and an AC-group's passes must be applied in increasing
    /// `p`. A section whose dependency isn't yet met is reported
    /// [`SectionOutcome::Skipped`] without being marked, so callers can
    /// retry it once its dependency clears.
    pub fn mark_applied(&mut self, logical_index: usize) -> SectionOutcome {
        let Some(id) = self.section_id(logical_index) else {
            return SectionOutcome::Skipped;
        };
        let num_groups = self.dims.num_groups() as usize;
        let already = match id {
            SectionId::DcGlobal => std::mem::replace(&mut self.dc_global_done, true),
            SectionId::DcGroup(g) => {
                let slot = &mut self.dc_groups_done[g as usize];
                std::mem::replace(slot, true)
            }
            SectionId::AcGlobal => {
                if !self.dc_ready() {
                    return SectionOutcome::Skipped;
                }
                std::mem::replace(&mut self.ac_global_done, true)
            }
            SectionId::AcGroup { pass, group } => {
                if !self.dc_ready() {
                    return SectionOutcome::Skipped;
                }
                if pass > 0 {
                    let prev_idx = (pass - 1) as usize * num_groups + group as usize;
                    if !self.ac_groups_done[prev_idx] {
                        return SectionOutcome::Skipped;
                    }
                }
                let idx = pass as usize * num_groups + group as usize;
                let slot = &mut self.ac_groups_done[idx];
                std::mem::replace(slot, true)
            }
        };
        self.advance_phase();
        if already {
            SectionOutcome::Duplicate
        } else {
            SectionOutcome::Applied
        }
    }

    fn advance_phase(&mut self) {
        if self.phase == Phase::TocRead && self.dc_global_done {
            self.phase = Phase::DcGroups;
        }
        if self.phase == Phase::DcGroups && self.dc_groups_done.iter().all(|&d| d) {
            self.phase = Phase::DcFinalized;
        }
        if self.phase == Phase::DcFinalized && self.ac_global_done {
            self.phase = Phase::AcGroups;
        }
        if self.phase == Phase::AcGroups && self.ac_groups_done.iter().all(|&d| d) {
            self.phase = Phase::Finalized;
        }
        if self.single_section() && self.dc_global_done {
            self.phase = Phase::Finalized;
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{Blending, BlendMode, ColorTransform, Encoding, FrameFlags, FrameType, LoopFilterParams};

    fn header() -> FrameHeader {
        FrameHeader {
            frame_type: FrameType::Regular,
            encoding: Encoding::VarDct,
            flags: FrameFlags { use_lf_frame: false, skip_adaptive_dc_smoothing: false, use_noise: false, raw: 0 },
            color_transform: ColorTransform::Xyb,
            chroma_subsampling: [0, 0, 0],
            upsampling: 1,
            passes: 1,
            x0: 0,
            y0: 0,
            width: 300,
            height: 300,
            blending: Blending { mode: BlendMode::Replace, source: 0 },
            loop_filter: LoopFilterParams { gaborish: true, epf_iters: 2 },
            is_last: true,
            name: Vec::new(),
        }
    }

    #[test]
    fn single_group_single_pass_collapses_to_one_section() {
        let dims = FrameDimensions::new(300, 300, 0);
        assert_eq!(dims.num_groups(), 1);
        let toc = Toc { sizes: vec![100], order: vec![0] };
        let mut state = FrameState::new(header(), dims, toc);
        assert_eq!(state.section_id(0), Some(SectionId::DcGlobal));
        assert_eq!(state.mark_applied(0), SectionOutcome::Applied);
        assert!(state.is_finalized());
    }

    #[test]
    fn duplicate_section_is_reported_not_fatal() {
        let dims = FrameDimensions::new(300, 300, 0);
        let toc = Toc { sizes: vec![100], order: vec![0] };
        let mut state = FrameState::new(header(), dims, toc);
        state.mark_applied(0);
        assert_eq!(state.mark_applied(0), SectionOutcome::Duplicate);
    }

    #[test]
    fn multi_group_walks_through_every_phase() {
        let mut h = header();
        h.width = 2000;
        h.height = 2000;
        let dims = FrameDimensions::new(2000, 2000, 0);
        assert!(dims.num_groups() > 1);
        let num_sections = Toc::num_sections(&dims, 1);
        let toc = Toc { sizes: vec![10; num_sections], order: (0..num_sections as u32).collect() };
        let mut state = FrameState::new(h, dims, toc);
        assert_eq!(state.phase(), Phase::TocRead);
        state.mark_applied(0);
        assert_eq!(state.phase(), Phase::DcGroups);
        for i in 1..=dims.num_dc_groups() as usize {
            state.mark_applied(i);
        }
        assert_eq!(state.phase(), Phase::DcFinalized);
        let ac_global_idx = dims.num_dc_groups() as usize + 1;
        state.mark_applied(ac_global_idx);
        assert_eq!(state.phase(), Phase::AcGroups);
        for g in 0..dims.num_groups() as usize {
            state.mark_applied(ac_global_idx + 1 + g);
        }
        assert!(state.is_finalized());
    }

    #[test]
    fn ac_global_before_dc_finalized_is_skipped_not_applied() {
        let mut h = header();
        h.width = 2000;
        h.height = 2000;
        let dims = FrameDimensions::new(2000, 2000, 0);
        let num_sections = Toc::num_sections(&dims, 1);
        let toc = Toc { sizes: vec![10; num_sections], order: (0..num_sections as u32).collect() };
        let mut state = FrameState::new(h, dims, toc);
        let ac_global_idx = dims.num_dc_groups() as usize + 1;
        // DC groups haven't been applied yet: AC-global must be deferred.
        assert_eq!(state.mark_applied(ac_global_idx), SectionOutcome::Skipped);
        assert_eq!(state.phase(), Phase::TocRead);
    }

    #[test]
    fn ac_group_pass_out_of_order_is_skipped() {
        let mut h = header();
        h.width = 2000;
        h.height = 2000;
        h.passes = 2;
        let dims = FrameDimensions::new(2000, 2000, 0);
        let num_sections = Toc::num_sections(&dims, 2);
        let toc = Toc { sizes: vec![10; num_sections], order: (0..num_sections as u32).collect() };
        let mut state = FrameState::new(h, dims, toc);

        state.mark_applied(0);
        for i in 1..=dims.num_dc_groups() as usize {
            state.mark_applied(i);
        }
        assert_eq!(state.phase(), Phase::DcFinalized);
        let ac_global_idx = dims.num_dc_groups() as usize + 1;
        state.mark_applied(ac_global_idx);

        let num_groups = dims.num_groups() as usize;
        // Pass 1, group 0 arrives before pass 0, group 0: must be skipped.
        let pass1_group0 = ac_global_idx + 1 + num_groups;
        assert_eq!(state.mark_applied(pass1_group0), SectionOutcome::Skipped);

        // Applying pass 0 group 0 first, then pass 1 group 0, succeeds.
        let pass0_group0 = ac_global_idx + 1;
        assert_eq!(state.mark_applied(pass0_group0), SectionOutcome::Applied);
        assert_eq!(state.mark_applied(pass1_group0), SectionOutcome::Applied);
    }
}
