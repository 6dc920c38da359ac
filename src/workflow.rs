use crate::download::{SaveSink, SavedArtifact};
use crate::error::{ErrorMessage, TransportError, WorkflowError};
use crate::selection::FormSelection;
use crate::transport::{FilePart, ProcessRequest, RemoteResponse, Transport};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_FORM_ID: AtomicU64 = AtomicU64::new(1);

/// The two upload forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// One input file plus the tracker.
    Latest,
    /// A batch of input files plus the tracker.
    Backlog,
}

impl FormKind {
    pub fn title(self) -> &'static str {
        match self {
            FormKind::Latest => "Upload Latest Files",
            FormKind::Backlog => "Upload Backlog Files",
        }
    }

    pub fn endpoint(self) -> &'static str {
        match self {
            FormKind::Latest => "process_latest",
            FormKind::Backlog => "process_backlog",
        }
    }

    pub fn input_field(self) -> &'static str {
        match self {
            FormKind::Latest => "input_file",
            FormKind::Backlog => "input_files",
        }
    }

    pub fn tracker_field(self) -> &'static str {
        "tracker_file"
    }

    /// Name the processed file is saved under. Any server supplied name is ignored.
    pub fn download_name(self) -> &'static str {
        match self {
            FormKind::Latest => "updated_latest_tracker.xlsx",
            FormKind::Backlog => "processed_tracker.xlsx",
        }
    }

    pub fn empty_selection(self) -> FormSelection {
        match self {
            FormKind::Latest => FormSelection::single(),
            FormKind::Backlog => FormSelection::batch(),
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormKind::Latest => f.write_str("latest"),
            FormKind::Backlog => f.write_str("backlog"),
        }
    }
}

/// Resting state of a form. Success and failure both come back to `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowStatus {
    Idle,
    Submitting,
}

/// Identifies one submission of one form instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubmissionTicket {
    form_id: u64,
    generation: u64,
}

/// A submission that passed validation and is ready to be sent.
#[derive(Debug)]
pub struct Submission {
    pub ticket: SubmissionTicket,
    pub request: ProcessRequest,
}

/// How a submission ended.
#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The processed file was handed to the save sink.
    Saved(SavedArtifact),
    /// The form shows this message; its files are untouched.
    Failed(ErrorMessage),
    /// The form was closed or replaced while the request was in flight.
    Discarded,
    /// Another submission from this form is still running.
    Busy,
}

/// State machine shared by both upload forms.
#[derive(Debug)]
pub struct WorkflowController {
    kind: FormKind,
    form_id: u64,
    generation: u64,
    selection: FormSelection,
    status: WorkflowStatus,
    error: Option<ErrorMessage>,
}

impl WorkflowController {
    pub fn new(kind: FormKind) -> Self {
        WorkflowController {
            kind,
            form_id: NEXT_FORM_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            selection: kind.empty_selection(),
            status: WorkflowStatus::Idle,
            error: None,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn selection(&self) -> &FormSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut FormSelection {
        &mut self.selection
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn error(&self) -> Option<&ErrorMessage> {
        self.error.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.status == WorkflowStatus::Submitting
    }

    /// Whether the submit action is enabled
    ///
    /// # Returns
    /// * `bool` - `false` while a submission is running or while a required file is missing
    ///
    /// # Examples
    /// ```
    /// use tracker::selection::SelectedFile;
    /// use tracker::workflow::{FormKind, WorkflowController};
    ///
    /// let mut form = WorkflowController::new(FormKind::Latest);
    /// assert!(!form.can_submit());
    /// form.selection_mut().add_inputs([SelectedFile::new("in.xlsx", vec![1])]);
    /// form.selection_mut().add_tracker([SelectedFile::new("tracker.xlsx", vec![2])]);
    /// assert!(form.can_submit());
    ///
    /// form.begin_submit().unwrap();
    /// assert!(!form.can_submit());
    /// assert_eq!(form.submit_label(), "Processing...");
    /// ```
    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && self.selection.is_complete()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_submitting() {
            "Processing..."
        } else {
            "Process"
        }
    }

    /// Clear the error box. The selected files are kept.
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Validate the selection and enter `Submitting`
    ///
    /// Clears any earlier error and starts a new generation, so results of older submissions
    /// of this form are discarded by [`WorkflowController::complete`].
    ///
    /// # Returns
    /// * `Ok(Submission)` - The ticket to complete with and the request to send
    /// * `Err(WorkflowError::MissingFiles)` - A file is missing; the form stays `Idle` with the
    ///   validation message set and no request is built
    /// * `Err(WorkflowError::Busy)` - A submission from this form is still running
    ///
    /// # Examples
    /// ```
    /// use tracker::selection::SelectedFile;
    /// use tracker::workflow::{FormKind, WorkflowController, WorkflowStatus};
    ///
    /// let mut form = WorkflowController::new(FormKind::Backlog);
    /// form.selection_mut().add_tracker([SelectedFile::new("tracker.xlsx", vec![])]);
    /// assert!(form.begin_submit().is_err());
    /// assert_eq!(form.status(), WorkflowStatus::Idle);
    /// assert_eq!(
    ///     form.error().map(|e| e.as_str()),
    ///     Some("Please upload both input and tracker files.")
    /// );
    ///
    /// form.selection_mut().add_inputs([SelectedFile::new("week-1.xlsx", vec![])]);
    /// let submission = form.begin_submit().unwrap();
    /// assert_eq!(submission.request.endpoint, "process_backlog");
    /// assert_eq!(submission.request.field_names(), ["input_files", "tracker_file"]);
    /// assert!(form.error().is_none());
    /// ```
    pub fn begin_submit(&mut self) -> Result<Submission, WorkflowError> {
        if self.is_submitting() {
            return Err(WorkflowError::Busy);
        }
        let Some(request) = self.build_request() else {
            let err = WorkflowError::MissingFiles(self.kind);
            log::debug!("{}", err);
            self.error = Some(err.user_message());
            return Err(err);
        };

        self.error = None;
        self.status = WorkflowStatus::Submitting;
        self.generation += 1;
        Ok(Submission {
            ticket: SubmissionTicket {
                form_id: self.form_id,
                generation: self.generation,
            },
            request,
        })
    }

    fn build_request(&self) -> Option<ProcessRequest> {
        if !self.selection.is_complete() {
            return None;
        }
        let tracker = self.selection.tracker()?;

        let mut parts: Vec<FilePart> = self
            .selection
            .inputs()
            .into_iter()
            .map(|file| FilePart {
                field: self.kind.input_field(),
                file_name: file.name.clone(),
                contents: file.contents.clone(),
            })
            .collect();
        parts.push(FilePart {
            field: self.kind.tracker_field(),
            file_name: tracker.name.clone(),
            contents: tracker.contents.clone(),
        });

        Some(ProcessRequest {
            endpoint: self.kind.endpoint(),
            parts,
        })
    }

    /// Whether a ticket still belongs to the running submission of this form.
    pub fn is_current(&self, ticket: &SubmissionTicket) -> bool {
        ticket.form_id == self.form_id
            && ticket.generation == self.generation
            && self.is_submitting()
    }

    /// Apply the result of a submission and return to `Idle`
    ///
    /// # Arguments
    /// * `ticket` - Ticket from [`WorkflowController::begin_submit`]
    /// * `response` - What the transport returned
    /// * `sink` - Receives the processed file under the form's fixed download name
    ///
    /// # Returns
    /// * `SubmitOutcome::Discarded` - The ticket is stale; nothing is saved and no state changes
    /// * `SubmitOutcome::Saved` - A success status; the body was handed to `sink`
    /// * `SubmitOutcome::Failed` - The message now shown on the form
    ///
    /// # Examples
    /// ```
    /// use tracker::download::{SaveSink, SavedArtifact};
    /// use tracker::selection::SelectedFile;
    /// use tracker::transport::RemoteResponse;
    /// use tracker::workflow::{FormKind, SubmitOutcome, WorkflowController};
    ///
    /// struct Discard;
    /// impl SaveSink for Discard {
    ///     fn save(&mut self, name: &str, contents: &[u8]) -> std::io::Result<SavedArtifact> {
    ///         Ok(SavedArtifact { file_name: name.to_string(), location: None, size: contents.len() })
    ///     }
    /// }
    ///
    /// let mut form = WorkflowController::new(FormKind::Latest);
    /// form.selection_mut().add_inputs([SelectedFile::new("in.xlsx", vec![])]);
    /// form.selection_mut().add_tracker([SelectedFile::new("tracker.xlsx", vec![])]);
    /// let submission = form.begin_submit().unwrap();
    ///
    /// let response = RemoteResponse { status: 500, body: b"KeyError".to_vec() };
    /// let outcome = form.complete(&submission.ticket, Ok(response), &mut Discard);
    /// assert_eq!(outcome, SubmitOutcome::Failed("Server error. Try again in a few minutes.".into()));
    /// ```
    pub fn complete<S: SaveSink>(
        &mut self,
        ticket: &SubmissionTicket,
        response: Result<RemoteResponse, TransportError>,
        sink: &mut S,
    ) -> SubmitOutcome {
        if !self.is_current(ticket) {
            log::debug!("Discarding stale {} submission result", self.kind);
            return SubmitOutcome::Discarded;
        }
        self.status = WorkflowStatus::Idle;

        match self.deliver(response, sink) {
            Ok(artifact) => SubmitOutcome::Saved(artifact),
            Err(err) => {
                let message = err.user_message();
                self.error = Some(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    fn deliver<S: SaveSink>(
        &self,
        response: Result<RemoteResponse, TransportError>,
        sink: &mut S,
    ) -> Result<SavedArtifact, WorkflowError> {
        let response = response.map_err(|err| {
            log::error!("Processing error: {}", err);
            WorkflowError::Transport(err)
        })?;

        if !response.is_success() {
            log::warn!(
                "{} responded with status {}",
                self.kind.endpoint(),
                response.status
            );
            return Err(WorkflowError::RemoteStatus {
                status: response.status,
            });
        }

        let file_name = self.kind.download_name();
        sink.save(file_name, &response.body)
            .map_err(|source| {
                log::error!("Saving {} failed: {}", file_name, source);
                WorkflowError::Save {
                    file_name: file_name.to_string(),
                    source,
                }
            })
    }

    /// Run one whole submission: validate, send, then deliver or report
    ///
    /// # Arguments
    /// * `transport` - Sends the multipart request
    /// * `sink` - Receives the processed file on success
    ///
    /// # Returns
    /// * `SubmitOutcome` - `Busy` if a submission is already running, otherwise as
    ///   [`WorkflowController::complete`]; validation failures come back as `Failed`
    pub async fn submit<T: Transport, S: SaveSink>(
        &mut self,
        transport: &T,
        sink: &mut S,
    ) -> SubmitOutcome {
        let submission = match self.begin_submit() {
            Ok(submission) => submission,
            Err(WorkflowError::Busy) => return SubmitOutcome::Busy,
            Err(err) => return SubmitOutcome::Failed(err.user_message()),
        };

        let response = transport.send(submission.request).await;
        self.complete(&submission.ticket, response, sink)
    }

    /// Mark the form closed
    ///
    /// The form returns to `Idle` and any submission still in flight becomes stale: its
    /// result will be `Discarded`.
    pub fn detach(&mut self) {
        self.generation += 1;
        self.status = WorkflowStatus::Idle;
    }
}
