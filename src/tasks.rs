//! Background workers.
//!
//! Each request runs on its own thread and sends exactly one
//! [`TaskOutcome`] back. Only the UI thread consumes outcomes, so all state
//! changes stay on one thread.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Local;

use crate::export::{self, ExportError, ExportFormat};
use crate::model::{HealthStatus, Record, ResultSet, UploadReceipt};
use crate::query::Ticket;
use crate::service::{AnalyticsService, ServiceError};
use crate::upload;

/// Why a health or area fetch ran. Only startup failures raise the connectivity banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    Startup,
    AfterUpload,
}

#[derive(Debug)]
pub enum TaskOutcome {
    Query(Ticket, Result<ResultSet, ServiceError>),
    Health(FetchReason, Result<HealthStatus, ServiceError>),
    Areas(FetchReason, Result<Vec<String>, ServiceError>),
    Upload(Result<UploadReceipt, ServiceError>),
    Sample(Result<PathBuf, ExportError>),
    Export(ExportFormat, Result<PathBuf, ExportError>),
}

pub struct TaskRunner {
    service: Arc<dyn AnalyticsService>,
    tx: Sender<TaskOutcome>,
    rx: Receiver<TaskOutcome>,
    in_flight: usize,
}

impl TaskRunner {
    pub fn new(service: Arc<dyn AnalyticsService>) -> Self {
        let (tx, rx) = channel();
        Self {
            service,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Fails only when the OS refuses a new thread; no outcome will arrive then.
    fn spawn<F>(&mut self, name: &str, job: F) -> io::Result<()>
    where
        F: FnOnce(&dyn AnalyticsService) -> TaskOutcome + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("task-{}", name))
            .spawn(move || {
                let outcome = job(&*service);
                // The receiver only goes away when the app is shutting down.
                let _ = tx.send(outcome);
            });

        match spawned {
            Ok(_) => {
                self.in_flight += 1;
                Ok(())
            }
            Err(e) => {
                log::error!("could not start {} worker: {}", name, e);
                Err(e)
            }
        }
    }

    pub fn query(&mut self, ticket: Ticket) -> io::Result<()> {
        self.spawn("query", move |svc| {
            let outcome = svc.submit_query(&ticket.query);
            TaskOutcome::Query(ticket, outcome)
        })
    }

    pub fn health(&mut self, reason: FetchReason) -> io::Result<()> {
        self.spawn("health", move |svc| {
            TaskOutcome::Health(reason, svc.health())
        })
    }

    pub fn areas(&mut self, reason: FetchReason) -> io::Result<()> {
        self.spawn("areas", move |svc| {
            TaskOutcome::Areas(reason, svc.list_areas())
        })
    }

    /// Validation runs on the worker too; a rejected file never reaches the network.
    pub fn upload(&mut self, path: PathBuf) -> io::Result<()> {
        self.spawn("upload", move |svc| {
            let outcome = upload::prepare_upload(&path).and_then(|file| {
                log::info!("uploading {} ({} bytes)", file.file_name, file.bytes.len());
                svc.upload_dataset(&file)
            });
            TaskOutcome::Upload(outcome)
        })
    }

    pub fn sample(&mut self, dir: &Path) -> io::Result<()> {
        let dir = dir.to_path_buf();
        self.spawn("sample", move |svc| {
            TaskOutcome::Sample(export::save_sample(svc, &dir))
        })
    }

    pub fn export(&mut self, rows: Vec<Record>, format: ExportFormat, dir: &Path) -> io::Result<()> {
        let dir = dir.to_path_buf();
        let today = Local::now().date_naive();
        self.spawn("export", move |svc| {
            let outcome = export::export_rows(&rows, format, svc, &dir, today);
            TaskOutcome::Export(format, outcome)
        })
    }

    /// Outcomes that arrived since the last call, without blocking.
    pub fn drain(&mut self) -> Vec<TaskOutcome> {
        let outcomes: Vec<TaskOutcome> = self.rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(outcomes.len());
        outcomes
    }

    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<TaskOutcome> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                Some(outcome)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QueryFailure;
    use crate::upload::UploadFile;
    use serde_json::json;
    use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    /// Queries block until the test releases them, so ordering can be forced.
    struct GatedService {
        gates: Mutex<Vec<(String, Receiver<()>)>>,
        uploads: Mutex<usize>,
    }

    impl GatedService {
        fn new() -> Self {
            Self {
                gates: Mutex::new(Vec::new()),
                uploads: Mutex::new(0),
            }
        }

        fn gate(&self, query: &str) -> SyncSender<()> {
            let (tx, rx) = sync_channel(1);
            self.gates.lock().unwrap().push((query.to_string(), rx));
            tx
        }
    }

    impl AnalyticsService for GatedService {
        fn submit_query(&self, query: &str) -> Result<ResultSet, ServiceError> {
            let gate = {
                let mut gates = self.gates.lock().unwrap();
                let pos = gates.iter().position(|(q, _)| q == query);
                pos.map(|i| gates.remove(i).1)
            };
            if let Some(rx) = gate {
                rx.recv().unwrap();
            }
            if query.contains("Nowhere") {
                return Err(ServiceError::Rejected(QueryFailure {
                    error: "Area not found".into(),
                    suggestions: None,
                }));
            }
            Ok(serde_json::from_value(json!({
                "summary": query,
                "table": [{"area": query}]
            }))
            .unwrap())
        }
        fn upload_dataset(&self, _: &UploadFile) -> Result<UploadReceipt, ServiceError> {
            *self.uploads.lock().unwrap() += 1;
            Ok(UploadReceipt::default())
        }
        fn list_areas(&self) -> Result<Vec<String>, ServiceError> {
            Ok(vec!["Wakad".into()])
        }
        fn health(&self) -> Result<HealthStatus, ServiceError> {
            Err(ServiceError::Network("down".into()))
        }
        fn download_sample(&self) -> Result<Vec<u8>, ServiceError> {
            Ok(b"xlsx".to_vec())
        }
        fn generate_spreadsheet(&self, _: &[Record]) -> Result<Vec<u8>, ServiceError> {
            Ok(b"xlsx".to_vec())
        }
    }

    fn ticket(generation: u64, query: &str) -> Ticket {
        Ticket {
            generation,
            query: query.into(),
        }
    }

    #[test]
    fn outcomes_arrive_in_completion_order() {
        let service = Arc::new(GatedService::new());
        let release_first = service.gate("Analyze Wakad");
        let mut runner = TaskRunner::new(service.clone());

        runner.query(ticket(1, "Analyze Wakad")).unwrap();
        runner.query(ticket(2, "Analyze Aundh")).unwrap();
        assert!(runner.busy());

        match runner.recv_timeout(WAIT) {
            Some(TaskOutcome::Query(t, Ok(rs))) => {
                assert_eq!(t.generation, 2);
                assert_eq!(rs.summary(), Some("Analyze Aundh"));
            }
            other => panic!("unexpected {:?}", other),
        }

        release_first.send(()).unwrap();
        match runner.recv_timeout(WAIT) {
            Some(TaskOutcome::Query(t, _)) => assert_eq!(t.generation, 1),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!runner.busy());
    }

    #[test]
    fn late_response_is_dropped_by_orchestrator() {
        use crate::query::{QueryOrchestrator, Settlement};

        let service = Arc::new(GatedService::new());
        let release_first = service.gate("Analyze Wakad");
        let mut runner = TaskRunner::new(service.clone());
        let mut orchestrator = QueryOrchestrator::default();

        runner.query(orchestrator.submit("Analyze Wakad").unwrap()).unwrap();
        runner.query(orchestrator.submit("Analyze Aundh").unwrap()).unwrap();

        let mut settlements = Vec::new();
        for release in [None, Some(release_first)] {
            if let Some(tx) = release {
                tx.send(()).unwrap();
            }
            if let Some(TaskOutcome::Query(t, outcome)) = runner.recv_timeout(WAIT) {
                settlements.push(orchestrator.settle(&t, outcome));
            }
        }

        assert_eq!(settlements, vec![Settlement::Succeeded, Settlement::Stale]);
        assert_eq!(orchestrator.result().unwrap().summary(), Some("Analyze Aundh"));
    }

    #[test]
    fn rejected_query_is_reported() {
        let mut runner = TaskRunner::new(Arc::new(GatedService::new()));
        runner.query(ticket(1, "Analyze Nowhere")).unwrap();
        match runner.recv_timeout(WAIT) {
            Some(TaskOutcome::Query(_, Err(e))) => assert_eq!(e.query_message(), "Area not found"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn startup_fetches() {
        let mut runner = TaskRunner::new(Arc::new(GatedService::new()));
        runner.health(FetchReason::Startup).unwrap();
        runner.areas(FetchReason::Startup).unwrap();

        let mut got_health = false;
        let mut got_areas = false;
        for _ in 0..2 {
            match runner.recv_timeout(WAIT) {
                Some(TaskOutcome::Health(FetchReason::Startup, Err(_))) => got_health = true,
                Some(TaskOutcome::Areas(FetchReason::Startup, Ok(a))) => {
                    assert_eq!(a, vec!["Wakad".to_string()]);
                    got_areas = true;
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(got_health && got_areas);
    }

    #[test]
    fn invalid_upload_never_calls_service() {
        let service = Arc::new(GatedService::new());
        let mut runner = TaskRunner::new(service.clone());
        runner.upload(PathBuf::from("/nonexistent/data.csv")).unwrap();

        match runner.recv_timeout(WAIT) {
            Some(TaskOutcome::Upload(Err(ServiceError::Validation(msg)))) => {
                assert_eq!(msg, "Please select a valid Excel file (.xlsx or .xls)")
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(*service.uploads.lock().unwrap(), 0);
    }

    #[test]
    fn export_and_sample_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = TaskRunner::new(Arc::new(GatedService::new()));

        let rows = vec![json!({"area": "Wakad", "year": 2023})
            .as_object()
            .cloned()
            .unwrap()];
        runner.export(rows, ExportFormat::Csv, dir.path()).unwrap();
        match runner.recv_timeout(WAIT) {
            Some(TaskOutcome::Export(ExportFormat::Csv, Ok(path))) => {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                assert!(name.starts_with("wakad_") && name.ends_with(".csv"));
            }
            other => panic!("unexpected {:?}", other),
        }

        runner.sample(dir.path()).unwrap();
        match runner.recv_timeout(WAIT) {
            Some(TaskOutcome::Sample(Ok(path))) => assert!(path.exists()),
            other => panic!("unexpected {:?}", other),
        }

        runner.export(Vec::new(), ExportFormat::Spreadsheet, dir.path()).unwrap();
        assert!(matches!(
            runner.recv_timeout(WAIT),
            Some(TaskOutcome::Export(_, Err(ExportError::NoData)))
        ));
    }
}
