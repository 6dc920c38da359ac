use crate::overlay::OverlayProps;
use crate::placement::Placement;
use crate::workflow::{FormKind, WorkflowController};

pub const HEADER: &str = "Fire and Gas Tracker Bot";

/// Dimmed background behind an open form.
pub const POPUP_BACKDROP: &str = "rgba(0, 0, 0, 0.5)";

/// A menu card on the main screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MenuCard {
    pub form: FormKind,
    pub heading: &'static str,
    pub instructions: &'static [&'static str],
}

pub const MENU: [MenuCard; 2] = [
    MenuCard {
        form: FormKind::Latest,
        heading: "Latest",
        instructions: &[
            "Accepts only one input file.",
            "File must be in Excel format (.xlsx).",
            "A tracker file must be uploaded along with the input file.",
            "Processes the files immediately upon upload.",
            "Generates and provides a processed file for download.",
        ],
    },
    MenuCard {
        form: FormKind::Backlog,
        heading: "Backlog",
        instructions: &[
            "Allows multiple input files to be uploaded at once.",
            "All files must be in Excel format (.xlsx).",
            "Requires an additional tracker file for processing.",
            "Processes all files together as a batch.",
            "Once complete, provides a processed file for download.",
        ],
    },
];

/// Overlay configuration the main screen opens its forms with.
pub fn popup_props<E>() -> OverlayProps<E> {
    OverlayProps {
        placement: Placement::Centered,
        overlay_color: Some(POPUP_BACKDROP.to_string()),
        ..OverlayProps::default()
    }
}

/// Which forms are open. Both may be open at the same time.
#[derive(Debug, Default)]
pub struct MainScreen {
    latest: Option<WorkflowController>,
    backlog: Option<WorkflowController>,
}

impl MainScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: FormKind) -> &mut Option<WorkflowController> {
        match kind {
            FormKind::Latest => &mut self.latest,
            FormKind::Backlog => &mut self.backlog,
        }
    }

    /// Open a form. A form that is already open keeps its state.
    pub fn open(&mut self, kind: FormKind) -> &mut WorkflowController {
        self.slot(kind)
            .get_or_insert_with(|| WorkflowController::new(kind))
    }

    /// Close a form from Cancel or an outside click. Its state is discarded and any
    /// submission still in flight will be ignored when it returns.
    pub fn close(&mut self, kind: FormKind) {
        if let Some(mut form) = self.slot(kind).take() {
            form.detach();
            log::debug!("Closed {} form", kind);
        }
    }

    pub fn is_open(&self, kind: FormKind) -> bool {
        self.form(kind).is_some()
    }

    pub fn form(&self, kind: FormKind) -> Option<&WorkflowController> {
        match kind {
            FormKind::Latest => self.latest.as_ref(),
            FormKind::Backlog => self.backlog.as_ref(),
        }
    }

    pub fn form_mut(&mut self, kind: FormKind) -> Option<&mut WorkflowController> {
        self.slot(kind).as_mut()
    }
}
