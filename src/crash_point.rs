//! Injected process aborts for exercising write atomicity
//!
//! Setting `DOCLOOM_CRASH_POINT` to a point's name makes the store abort the
//! process when it reaches that point. Abort skips destructors, so whatever
//! is on disk at that moment is what a real crash would leave behind.
//!
//! ```bash
//! DOCLOOM_CRASH_POINT=store_after_stage cargo test --test store_crash
//! ```

use std::sync::OnceLock;

pub const CRASH_POINT_ENV: &str = "DOCLOOM_CRASH_POINT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Before the temp file is opened
    BeforeStage,
    /// Temp file written and synced, not yet renamed
    AfterStage,
    /// Rename done, directory not yet synced
    AfterRename,
    /// Before a document file is removed
    BeforeDelete,
}

impl CrashPoint {
    pub const ALL: [CrashPoint; 4] = [
        CrashPoint::BeforeStage,
        CrashPoint::AfterStage,
        CrashPoint::AfterRename,
        CrashPoint::BeforeDelete,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CrashPoint::BeforeStage => "store_before_stage",
            CrashPoint::AfterStage => "store_after_stage",
            CrashPoint::AfterRename => "store_after_rename",
            CrashPoint::BeforeDelete => "store_before_delete",
        }
    }

    /// The point armed for this process, read once
    pub fn armed() -> Option<CrashPoint> {
        static ARMED: OnceLock<Option<CrashPoint>> = OnceLock::new();
        *ARMED.get_or_init(|| {
            let name = std::env::var(CRASH_POINT_ENV).ok()?;
            Self::ALL.into_iter().find(|p| p.name() == name)
        })
    }
}

/// Aborts the process if `point` is armed
#[inline]
pub fn maybe_crash(point: CrashPoint) {
    if CrashPoint::armed() == Some(point) {
        eprintln!("docloom: aborting at crash point {}", point.name());
        std::process::abort();
    }
}
