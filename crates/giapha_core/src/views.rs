//! Downstream view invalidation after dataset-wide changes.
//!
//! A restore replaces the whole register, so every rendered listing must be
//! rebuilt. The hosting layer decides what invalidation means; core only
//! names the views.

use log::info;

/// Root listing view.
pub const VIEW_ROOT: &str = "/";
/// Dashboard root view.
pub const VIEW_DASHBOARD: &str = "/dashboard";
/// Dashboard data management view.
pub const VIEW_DASHBOARD_DATA: &str = "/dashboard/data";

/// Views invalidated after a successful restore, in signal order.
pub const DATASET_VIEWS: [&str; 3] = [VIEW_ROOT, VIEW_DASHBOARD, VIEW_DASHBOARD_DATA];

/// Receiver of view invalidation signals.
pub trait ViewInvalidator {
    fn invalidate(&self, view: &str);
}

/// Signals every dataset view on `invalidator`.
pub fn invalidate_dataset_views(invalidator: &dyn ViewInvalidator) {
    for view in DATASET_VIEWS {
        invalidator.invalidate(view);
    }
}

/// Invalidator that only emits a log event; used when no cache is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogViewInvalidator;

impl ViewInvalidator for LogViewInvalidator {
    fn invalidate(&self, view: &str) {
        info!("event=view_invalidate module=views status=ok view={view}");
    }
}

#[cfg(test)]
mod tests {
    use super::{invalidate_dataset_views, ViewInvalidator};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<String>>);

    impl ViewInvalidator for Recorder {
        fn invalidate(&self, view: &str) {
            self.0.borrow_mut().push(view.to_string());
        }
    }

    #[test]
    fn dataset_views_are_signalled_in_order() {
        let recorder = Recorder::default();
        invalidate_dataset_views(&recorder);
        assert_eq!(
            *recorder.0.borrow(),
            vec!["/", "/dashboard", "/dashboard/data"]
        );
    }
}
