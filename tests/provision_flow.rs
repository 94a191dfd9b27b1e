//! Mocked end-to-end tests for the provisioning pipeline
//!
//! These drive the full sequence against an in-memory control plane:
//! no AWS credentials, no network, millisecond wait profiles.

use anyhow::Result;
use dbstack::aws::types::{
    ComputeInstance, ComputeState, DbEndpoint, DbInstanceInfo, NetworkContext,
};
use dbstack::aws::ProvisionOps;
use dbstack::provision::{provision, status, ProvisionConfig};
use dbstack::report;
use dbstack::wait::WaitConfig;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory control plane double.
///
/// State transitions mirror the real provider: creating the database makes
/// subsequent describes return the scripted status sequence (falling back to
/// "available"); launching the instance makes describes walk the scripted
/// state sequence (falling back to running with addresses assigned).
#[derive(Default)]
struct FakeCloud {
    network: Option<NetworkContext>,
    fail_ingress: bool,

    db_exists: AtomicBool,
    db_statuses: Mutex<VecDeque<&'static str>>,
    compute_exists: AtomicBool,
    compute_states: Mutex<VecDeque<ComputeState>>,

    ingress_calls: AtomicU32,
    db_find_calls: AtomicU32,
    db_create_calls: AtomicU32,
    launch_calls: AtomicU32,
}

impl FakeCloud {
    fn with_defaults() -> Self {
        Self {
            network: Some(NetworkContext {
                vpc_id: "vpc-1".to_string(),
                security_group_id: "sg-1".to_string(),
                subnet_id: "subnet-1".to_string(),
                image_id: "ami-1".to_string(),
            }),
            ..Self::default()
        }
    }

    fn running_instance(&self) -> ComputeInstance {
        ComputeInstance {
            instance_id: "i-123".to_string(),
            state: ComputeState::Running,
            public_ip: Some("1.2.3.4".to_string()),
            private_ip: Some("172.31.0.5".to_string()),
        }
    }
}

impl ProvisionOps for FakeCloud {
    async fn discover_network(&self) -> Result<NetworkContext> {
        self.network
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No default VPC found"))
    }

    async fn authorize_stack_ingress(&self, _security_group_id: &str) -> Result<()> {
        self.ingress_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ingress {
            anyhow::bail!("Failed to add ingress rules to security group");
        }
        Ok(())
    }

    async fn find_db_instance(&self, identifier: &str) -> Result<Option<DbInstanceInfo>> {
        self.db_find_calls.fetch_add(1, Ordering::SeqCst);
        if !self.db_exists.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let status = self
            .db_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("available");
        let endpoint = (status == "available").then(|| DbEndpoint {
            address: "db.host".to_string(),
            port: 3306,
        });

        Ok(Some(DbInstanceInfo {
            identifier: identifier.to_string(),
            status: status.to_string(),
            endpoint,
        }))
    }

    async fn create_db_instance(&self, _identifier: &str, _security_group_id: &str) -> Result<()> {
        self.db_create_calls.fetch_add(1, Ordering::SeqCst);
        self.db_exists.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn find_instance_by_name(&self, _name: &str) -> Result<Option<ComputeInstance>> {
        if !self.compute_exists.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(Some(self.running_instance()))
    }

    async fn launch_instance(&self, _name: &str, _network: &NetworkContext) -> Result<String> {
        self.launch_calls.fetch_add(1, Ordering::SeqCst);
        self.compute_exists.store(true, Ordering::SeqCst);
        Ok("i-123".to_string())
    }

    async fn describe_instance(&self, _instance_id: &str) -> Result<Option<ComputeInstance>> {
        if !self.compute_exists.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let state = self
            .compute_states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ComputeState::Running);

        let mut instance = self.running_instance();
        if state != ComputeState::Running {
            instance.public_ip = None;
            instance.private_ip = None;
        }
        instance.state = state;

        Ok(Some(instance))
    }
}

fn fast_waits() -> ProvisionConfig {
    let wait = WaitConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        timeout: Duration::from_millis(500),
    };
    ProvisionConfig {
        db_wait: wait.clone(),
        compute_wait: wait,
    }
}

#[tokio::test]
async fn full_run_creates_both_resources_and_reports_endpoints() -> Result<()> {
    let cloud = FakeCloud::with_defaults();
    cloud
        .db_statuses
        .lock()
        .unwrap()
        .extend(["creating", "creating"]);
    cloud
        .compute_states
        .lock()
        .unwrap()
        .extend([ComputeState::Pending, ComputeState::Pending]);

    let report = provision(&cloud, &fast_waits()).await?;

    assert_eq!(report.db_address, "db.host");
    assert_eq!(report.db_port, 3306);
    assert_eq!(report.instance_id, "i-123");
    assert_eq!(report.public_ip.as_deref(), Some("1.2.3.4"));

    let text = report::render(&report);
    assert!(text.contains("db.host:3306"));
    assert!(text.contains("1.2.3.4"));

    assert_eq!(cloud.db_create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cloud.launch_calls.load(Ordering::SeqCst), 1);

    // All scripted "creating" statuses were consumed before the report:
    // the pipeline kept polling until the database reached "available".
    assert!(cloud.db_statuses.lock().unwrap().is_empty());
    assert!(cloud.compute_states.lock().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn second_run_reuses_existing_resources() -> Result<()> {
    let cloud = FakeCloud::with_defaults();

    provision(&cloud, &fast_waits()).await?;
    provision(&cloud, &fast_waits()).await?;

    assert_eq!(cloud.db_create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cloud.launch_calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn existing_stack_short_circuits_creation() -> Result<()> {
    let cloud = FakeCloud::with_defaults();
    cloud.db_exists.store(true, Ordering::SeqCst);
    cloud.compute_exists.store(true, Ordering::SeqCst);

    let report = provision(&cloud, &fast_waits()).await?;

    assert_eq!(cloud.db_create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cloud.launch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.instance_id, "i-123");

    Ok(())
}

#[tokio::test]
async fn missing_default_vpc_aborts_before_any_create_call() {
    let cloud = FakeCloud {
        network: None,
        ..FakeCloud::default()
    };

    let err = provision(&cloud, &fast_waits()).await.unwrap_err();

    assert!(err.to_string().contains("Default resource discovery failed"));
    assert_eq!(cloud.ingress_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cloud.db_create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cloud.launch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn firewall_failure_aborts_before_any_create_call() {
    let cloud = FakeCloud {
        fail_ingress: true,
        ..FakeCloud::with_defaults()
    };

    let err = provision(&cloud, &fast_waits()).await.unwrap_err();

    assert!(err.to_string().contains("Firewall configuration failed"));
    assert_eq!(cloud.db_create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cloud.launch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn report_waits_for_database_availability() -> Result<()> {
    let cloud = FakeCloud::with_defaults();
    cloud
        .db_statuses
        .lock()
        .unwrap()
        .extend(["creating", "creating", "backing-up"]);

    let before = cloud.db_find_calls.load(Ordering::SeqCst);
    provision(&cloud, &fast_waits()).await?;
    let find_calls = cloud.db_find_calls.load(Ordering::SeqCst) - before;

    // One ensure lookup, one poll per scripted non-available status, the
    // poll that finally observes "available", and the report lookup.
    assert!(find_calls >= 6, "expected at least 6 lookups, saw {find_calls}");

    Ok(())
}

#[tokio::test]
async fn unexpected_instance_state_fails_the_wait() {
    let cloud = FakeCloud::with_defaults();
    cloud
        .compute_states
        .lock()
        .unwrap()
        .push_back(ComputeState::Other("terminated".to_string()));

    let err = provision(&cloud, &fast_waits()).await.unwrap_err();

    assert!(err.to_string().contains("unexpected state"));
}

#[tokio::test]
async fn status_reports_without_creating_anything() -> Result<()> {
    let cloud = FakeCloud::with_defaults();
    cloud.db_exists.store(true, Ordering::SeqCst);
    cloud.compute_exists.store(true, Ordering::SeqCst);

    let report = status(&cloud).await?;

    assert_eq!(report.db_address, "db.host");
    assert_eq!(report.public_ip.as_deref(), Some("1.2.3.4"));
    assert_eq!(cloud.db_create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(cloud.launch_calls.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn status_fails_when_stack_is_absent() {
    let cloud = FakeCloud::with_defaults();

    let err = status(&cloud).await.unwrap_err();

    assert!(err.to_string().contains("run `dbstack up` first"));
}
