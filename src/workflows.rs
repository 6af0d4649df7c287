//! Upload and search workflows. Remote calls run on worker threads; their
//! outcomes come back as [`Completion`] messages and are applied on the UI
//! thread in one step, so the renderer never sees a half-applied result.

use crate::{
    analysis_state::{AnalysisState, SearchApplied, UploadedSequence},
    api::{SearchRequest, SearchResponse, SequenceFile, SequenceService},
    error::Result,
    history::{ClearRequest, HistoryDraft, HistoryEntry, HistoryStore},
    toast::Notifier,
    view_state::{ViewState, ViewStateMachine},
    visualization::VisualizationEngine,
};
use std::{
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SearchRejected {
    #[error("Please enter a search pattern")]
    EmptyPattern,
    #[error("Upload a sequence before searching")]
    NoSequence,
}

#[derive(Debug)]
pub enum Completion {
    Upload {
        generation: u64,
        file: SequenceFile,
        result: Result<UploadedSequence>,
    },
    Search {
        generation: u64,
        pattern: String,
        result: Result<SearchResponse>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingSearch {
    pub generation: u64,
    pub request: SearchRequest,
}

pub type Waker = Arc<dyn Fn() + Send + Sync>;

pub struct Session {
    state: AnalysisState,
    sequence: Option<UploadedSequence>,
    views: ViewStateMachine,
    history: HistoryStore,
    engine: VisualizationEngine,
    notifier: Notifier,
    service: Arc<dyn SequenceService>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    waker: Option<Waker>,
    upload_generation: u64,
    upload_settled: u64,
    search_generation: u64,
}

impl Session {
    pub fn new(
        service: Arc<dyn SequenceService>,
        history: HistoryStore,
        engine: VisualizationEngine,
    ) -> Self {
        let mut views = ViewStateMachine::new();
        views.add_observer(engine.transition_observer());
        let (tx, rx) = mpsc::channel();
        Self {
            state: AnalysisState::default(),
            sequence: None,
            views,
            history,
            engine,
            notifier: Notifier::new(),
            service,
            tx,
            rx,
            waker: None,
            upload_generation: 0,
            upload_settled: 0,
            search_generation: 0,
        }
    }

    /// Called from worker threads after they post a completion.
    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    pub fn sequence(&self) -> Option<&UploadedSequence> {
        self.sequence.as_ref()
    }

    pub fn views(&self) -> &ViewStateMachine {
        &self.views
    }

    pub fn current_view(&self) -> ViewState {
        self.views.current()
    }

    pub fn history_entries(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    pub fn reload_history(&mut self) -> Vec<HistoryEntry> {
        self.history.list()
    }

    pub fn request_clear_history(&self) -> ClearRequest {
        self.history.request_clear()
    }

    pub fn clear_history(&mut self, confirmed: ClearRequest) {
        self.history.clear(confirmed);
        self.notifier.success("History cleared");
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub fn scene_mut(&mut self) -> (&mut VisualizationEngine, &mut AnalysisState) {
        (&mut self.engine, &mut self.state)
    }

    pub fn is_uploading(&self) -> bool {
        self.upload_settled < self.upload_generation
    }

    /// Switches views, warning the user when the target is still locked.
    pub fn navigate(&mut self, target: ViewState) -> bool {
        match self.views.transition(target) {
            Ok(_) => {
                if target == ViewState::History {
                    self.history.list();
                }
                true
            }
            Err(e) => {
                self.notifier.error(e.to_string());
                false
            }
        }
    }

    pub fn begin_upload(&mut self, file: &SequenceFile) -> u64 {
        self.upload_generation += 1;
        debug!("Upload #{} of {}", self.upload_generation, file.name);
        self.upload_generation
    }

    pub fn complete_upload(
        &mut self,
        generation: u64,
        file: &SequenceFile,
        result: Result<UploadedSequence>,
    ) -> bool {
        if generation != self.upload_generation {
            debug!("Dropping stale upload #{generation} of {}", file.name);
            return false;
        }
        self.upload_settled = generation;

        match result {
            Ok(sequence) => {
                self.state.apply_upload(&sequence);
                // In-flight searches target the old sequence.
                self.search_generation += 1;
                self.state.is_searching = false;
                self.engine.reset_sequence_layers(&mut self.state);
                self.views.mark_uploaded();
                info!(
                    "Sequence {} loaded: {} bp",
                    sequence.display_name(),
                    sequence.length
                );
                self.notifier
                    .success(format!("Sequence imported: {}", sequence.display_name()));
                self.sequence = Some(sequence);
                self.navigate(ViewState::Dashboard);
            }
            Err(e) => {
                warn!("Upload of {} failed: {e}", file.name);
                self.notifier.error(format!("Upload failed: {e}"));
            }
        }
        true
    }

    /// Local checks, then flips the state into searching and shows the results view.
    pub fn begin_search(
        &mut self,
        pattern: &str,
    ) -> std::result::Result<PendingSearch, SearchRejected> {
        let pattern = pattern.trim();
        let checked = if pattern.is_empty() {
            Err(SearchRejected::EmptyPattern)
        } else {
            self.sequence
                .as_ref()
                .map(|s| s.id.clone())
                .ok_or(SearchRejected::NoSequence)
        };
        let sequence_id = match checked {
            Ok(id) => id,
            Err(rejected) => {
                self.notifier.error(rejected.to_string());
                return Err(rejected);
            }
        };

        self.search_generation += 1;
        self.state.is_searching = true;
        self.navigate(ViewState::Results);
        debug!("Search #{} for {pattern}", self.search_generation);
        Ok(PendingSearch {
            generation: self.search_generation,
            request: SearchRequest::new(sequence_id, pattern),
        })
    }

    pub fn complete_search(
        &mut self,
        generation: u64,
        pattern: &str,
        result: Result<SearchResponse>,
    ) -> bool {
        if generation != self.search_generation {
            debug!("Dropping stale search #{generation} for {pattern}");
            return false;
        }
        let file_name = self
            .sequence
            .as_ref()
            .map(|s| s.display_name().to_string())
            .unwrap_or_else(|| "Sequence".to_string());

        match result {
            Ok(response) => {
                let algorithm = response.algorithm().to_string();
                let elapsed = response.elapsed_ms();
                let total = response.total_matches();
                self.state.apply_search(SearchApplied {
                    pattern: pattern.to_string(),
                    matches: response.results,
                    algorithm: algorithm.clone(),
                    search_time_ms: elapsed,
                });
                self.engine.spawn_burst(&mut self.state);
                self.history.add(HistoryDraft::search_success(
                    pattern, &file_name, total, &algorithm, elapsed,
                ));
                self.notifier
                    .success(format!("Search complete: {total} matches"));
            }
            Err(e) => {
                self.state.is_searching = false;
                let message = e.to_string();
                self.history
                    .add(HistoryDraft::search_error(pattern, &file_name, &message));
                self.notifier.error(format!("Search failed: {message}"));
            }
        }
        true
    }

    /// Starts an upload on a worker thread.
    pub fn upload(&mut self, file: SequenceFile) -> u64 {
        let generation = self.begin_upload(&file);
        let service = self.service.clone();
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        thread::spawn(move || {
            let result = service.upload(&file);
            post(
                &tx,
                waker,
                Completion::Upload {
                    generation,
                    file,
                    result,
                },
            );
        });
        generation
    }

    /// Starts a search on a worker thread, unless rejected locally.
    pub fn search(&mut self, pattern: &str) -> std::result::Result<u64, SearchRejected> {
        let pending = self.begin_search(pattern)?;
        let service = self.service.clone();
        let tx = self.tx.clone();
        let waker = self.waker.clone();
        thread::spawn(move || {
            let result = service.search(&pending.request);
            post(
                &tx,
                waker,
                Completion::Search {
                    generation: pending.generation,
                    pattern: pending.request.pattern,
                    result,
                },
            );
        });
        Ok(pending.generation)
    }

    pub fn apply(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Upload {
                generation,
                file,
                result,
            } => self.complete_upload(generation, &file, result),
            Completion::Search {
                generation,
                pattern,
                result,
            } => self.complete_search(generation, &pattern, result),
        }
    }

    /// Applies every completion that arrived since the last frame.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Blocks for the next completion; `false` on timeout.
    pub fn wait_for_completion(&mut self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(completion) => {
                self.apply(completion);
                true
            }
            Err(_) => false,
        }
    }
}

fn post(tx: &Sender<Completion>, waker: Option<Waker>, completion: Completion) {
    if tx.send(completion).is_err() {
        debug!("Session gone, dropping completion");
        return;
    }
    if let Some(wake) = waker {
        wake();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        analysis_state::{SearchResult, SequenceId},
        api::SearchJob,
        error::AnalyzerError,
        history::HistoryStatus,
        storage::MemoryStore,
    };
    use std::sync::Mutex;

    type SearchFn = Box<dyn Fn(&SearchRequest) -> Result<SearchResponse> + Send + Sync>;

    struct FakeService {
        fail_upload: bool,
        search: SearchFn,
        searches: Mutex<Vec<SearchRequest>>,
    }

    impl FakeService {
        fn new(search: SearchFn) -> Self {
            Self {
                fail_upload: false,
                search,
                searches: Mutex::new(vec![]),
            }
        }
    }

    impl SequenceService for FakeService {
        fn upload(&self, file: &SequenceFile) -> Result<UploadedSequence> {
            if self.fail_upload {
                return Err(AnalyzerError::Api {
                    status: 400,
                    detail: "Invalid FASTA".to_string(),
                });
            }
            Ok(sequence(&file.name, 1000))
        }

        fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
            self.searches.lock().unwrap().push(request.clone());
            (self.search)(request)
        }
    }

    fn sequence(name: &str, length: usize) -> UploadedSequence {
        UploadedSequence {
            id: SequenceId(serde_json::json!(1)),
            name: name.to_string(),
            length,
            gc_content: Some(48.5),
        }
    }

    fn hit(position: usize) -> SearchResult {
        SearchResult {
            position,
            context_before: "AC".to_string(),
            context_after: "TG".to_string(),
        }
    }

    fn found(positions: &[usize]) -> SearchResponse {
        SearchResponse {
            job: Some(SearchJob {
                pattern: Some("GATC".to_string()),
                total_matches: Some(positions.len()),
                algorithm_used: Some("kmp".to_string()),
                search_time_ms: Some(0.3),
            }),
            results: positions.iter().map(|&p| hit(p)).collect(),
            end_to_end_ms: Some(4.0),
            ..Default::default()
        }
    }

    fn session_with(service: FakeService) -> (Session, Arc<FakeService>) {
        let service = Arc::new(service);
        let history = HistoryStore::new(Box::new(MemoryStore::new()));
        let mut session = Session::new(
            service.clone(),
            history,
            VisualizationEngine::with_seed(42),
        );
        let (engine, state) = session.scene_mut();
        engine.resize(state, 800.0, 500.0, 1.0);
        (session, service)
    }

    fn default_session() -> (Session, Arc<FakeService>) {
        session_with(FakeService::new(Box::new(|_| Ok(found(&[10, 10, 990])))))
    }

    fn uploaded_session() -> (Session, Arc<FakeService>) {
        let (mut session, service) = default_session();
        let file = SequenceFile::new("/tmp/chr21.fa", "chr21");
        let generation = session.begin_upload(&file);
        session.complete_upload(generation, &file, Ok(sequence("chr21", 1000)));
        (session, service)
    }

    #[test]
    fn navigation_is_gated_until_exactly_one_upload_succeeds() {
        let (mut session, _) = default_session();
        assert!(!session.navigate(ViewState::Dashboard));
        assert!(!session.navigate(ViewState::Results));
        assert_eq!(session.current_view(), ViewState::Upload);
        assert!(session.navigate(ViewState::History));
        assert!(session.navigate(ViewState::Upload));

        let file = SequenceFile::new("/tmp/a.fa", "a");
        let generation = session.begin_upload(&file);
        session.complete_upload(generation, &file, Ok(sequence("a", 1000)));
        assert_eq!(session.current_view(), ViewState::Dashboard);
        for target in ViewState::ALL {
            assert!(session.navigate(target));
        }
    }

    #[test]
    fn threaded_upload_seeds_state_without_history() {
        let (mut session, _) = default_session();
        session.upload(SequenceFile::new("/tmp/chr21.fa", "chr21"));
        assert!(session.is_uploading());
        assert!(session.wait_for_completion(Duration::from_secs(5)));

        assert!(!session.is_uploading());
        assert_eq!(session.sequence().map(|s| s.name.as_str()), Some("chr21"));
        assert_eq!(session.state().sequence_length, 1000);
        assert!((session.state().gc_content - 48.5).abs() < 1e-9);
        assert_eq!(session.state().pulse_rings.len(), 3);
        assert_eq!(session.current_view(), ViewState::Dashboard);
        assert!(session.history_entries().is_empty());
    }

    #[test]
    fn failed_upload_changes_nothing_and_writes_no_history() {
        let mut service = FakeService::new(Box::new(|_| Ok(found(&[]))));
        service.fail_upload = true;
        let (mut session, _) = session_with(service);
        session.upload(SequenceFile::new("/tmp/bad.fa", "bad"));
        assert!(session.wait_for_completion(Duration::from_secs(5)));

        assert!(session.sequence().is_none());
        assert!(!session.views().uploaded());
        assert_eq!(session.state().sequence_length, 0);
        assert_eq!(session.current_view(), ViewState::Upload);
        assert!(session.history_entries().is_empty());
        let toast = session.notifier_mut().last().unwrap().message.clone();
        assert_eq!(toast, "Upload failed: Invalid FASTA");
    }

    #[test]
    fn local_rejections_skip_service_and_history() {
        let (mut session, service) = default_session();
        assert_eq!(session.search("ACGT"), Err(SearchRejected::NoSequence));

        assert!(service.searches.lock().unwrap().is_empty());

        let (mut session, service) = uploaded_session();
        assert_eq!(session.search("   "), Err(SearchRejected::EmptyPattern));
        assert!(!session.state().is_searching);
        assert!(session.history_entries().is_empty());
        assert!(service.searches.lock().unwrap().is_empty());
    }

    #[test]
    fn successful_search_applies_results_and_adds_exactly_twenty_particles() {
        let (mut session, _) = uploaded_session();
        let pending = session.begin_search("GATC").unwrap();
        assert!(session.state().is_searching);
        assert_eq!(session.current_view(), ViewState::Results);

        let before = session.state().particles.len();
        assert!(session.complete_search(pending.generation, "GATC", Ok(found(&[10, 10, 990]))));
        let state = session.state();
        assert_eq!(state.particles.len(), before + 20);
        assert!(!state.is_searching);
        assert_eq!(state.matches.len(), 3);
        assert_eq!(state.algorithm.as_deref(), Some("kmp"));
        assert_eq!(state.search_time_ms, Some(4.0));
        assert_eq!(state.data_points.len(), 100);

        let entry = &session.history_entries()[0];
        assert_eq!(entry.status, HistoryStatus::Success);
        assert_eq!(entry.matches, Some(3));
        assert_eq!(entry.pattern.as_deref(), Some("GATC"));
        assert_eq!(entry.file_name.as_deref(), Some("chr21"));
    }

    #[test]
    fn failed_search_keeps_previous_matches_and_records_error() {
        let (mut session, _) = uploaded_session();
        let first = session.begin_search("GATC").unwrap();
        session.complete_search(first.generation, "GATC", Ok(found(&[5])));

        let second = session.begin_search("TTTT").unwrap();
        session.complete_search(
            second.generation,
            "TTTT",
            Err(AnalyzerError::Api {
                status: 500,
                detail: "matcher crashed".to_string(),
            }),
        );
        let state = session.state();
        assert!(!state.is_searching);
        assert_eq!(state.matches.len(), 1);
        assert_eq!(state.pattern.as_deref(), Some("GATC"));

        let entry = &session.history_entries()[0];
        assert_eq!(entry.status, HistoryStatus::Error);
        assert_eq!(entry.message.as_deref(), Some("matcher crashed"));
        assert_eq!(session.history_entries().len(), 2);
    }

    #[test]
    fn only_the_latest_search_is_applied() {
        let (mut session, _) = uploaded_session();
        let older = session.begin_search("AAAA").unwrap();
        let newer = session.begin_search("CCCC").unwrap();

        assert!(!session.complete_search(older.generation, "AAAA", Ok(found(&[1, 2]))));
        assert!(session.state().is_searching);
        assert!(session.state().matches.is_empty());

        assert!(session.complete_search(newer.generation, "CCCC", Ok(found(&[7]))));
        assert_eq!(session.state().pattern.as_deref(), Some("CCCC"));
        assert_eq!(session.history_entries().len(), 1);
    }

    #[test]
    fn new_upload_invalidates_in_flight_search() {
        let (mut session, _) = uploaded_session();
        let pending = session.begin_search("GATC").unwrap();
        let file = SequenceFile::new("/tmp/b.fa", "b");
        let generation = session.begin_upload(&file);
        session.complete_upload(generation, &file, Ok(sequence("b", 500)));
        assert!(!session.state().is_searching);

        assert!(!session.complete_search(pending.generation, "GATC", Ok(found(&[1]))));
        assert!(session.state().matches.is_empty());
        assert_eq!(session.state().sequence_length, 500);
    }

    #[test]
    fn threaded_search_sends_trimmed_overlapping_request() {
        let (mut session, service) = uploaded_session();
        session.search("  GATC ").unwrap();
        assert!(session.wait_for_completion(Duration::from_secs(5)));

        let requests = service.searches.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].pattern, "GATC");
        assert!(requests[0].allow_overlapping);
        assert_eq!(requests[0].sequence_id, SequenceId(serde_json::json!(1)));
        assert_eq!(session.state().matches.len(), 3);
        assert_eq!(session.poll(), 0);
    }

    #[test]
    fn render_keeps_running_while_search_is_in_flight() {
        let (mut session, _) = uploaded_session();
        session.begin_search("GATC").unwrap();
        let (engine, state) = session.scene_mut();
        let t0 = engine.time();
        for _ in 0..5 {
            assert!(engine.frame(state, None));
        }
        assert!(engine.time() > t0);
        assert!(session.state().is_searching);
    }
}
