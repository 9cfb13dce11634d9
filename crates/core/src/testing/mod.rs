//! Testing utilities and fake implementations of the runtime seams.
//!
//! Lets workflow logic and the worker be exercised without real bagging
//! or wall-clock time.
//!
//! # Example
//!
//! ```rust,ignore
//! use preprocessing_core::testing::{fixtures, FakeWorkflowContext};
//!
//! let ctx = FakeWorkflowContext::new();
//! ctx.set_response("bag-create", Ok(fixtures::bag_result(path)));
//!
//! let result = workflow.execute(&ctx, Some(params)).await?;
//! assert_eq!(ctx.recorded_calls().len(), 1);
//! ```

mod fake_context;
mod manual_clock;
mod mock_activity;

pub use fake_context::{FakeWorkflowContext, RecordedCall};
pub use manual_clock::ManualClock;
pub use mock_activity::MockActivity;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use chrono::{DateTime, TimeZone, Utc};

    use crate::bagcreate::BagCreateResult;

    /// The instant fake contexts and manual clocks start at.
    pub fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 6, 14, 48, 12)
            .single()
            .unwrap_or_default()
    }

    /// Successful bag creation response for `path`.
    pub fn bag_result(path: &Path) -> BagCreateResult {
        BagCreateResult {
            bag_path: path.to_path_buf(),
        }
    }

    /// Create a small transfer named `name` under `shared_path`.
    ///
    /// Layout: `README.txt`, `objects/image.tif`, `objects/notes/a.txt`.
    pub fn write_transfer(shared_path: &Path, name: &str) -> io::Result<PathBuf> {
        let root = shared_path.join(name);
        fs::create_dir_all(root.join("objects/notes"))?;
        fs::write(root.join("README.txt"), "transfer readme\n")?;
        fs::write(root.join("objects/image.tif"), [0x49u8, 0x49, 0x2a, 0x00])?;
        fs::write(root.join("objects/notes/a.txt"), "a")?;
        Ok(root)
    }
}
