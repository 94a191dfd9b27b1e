//! Connection report rendering
//!
//! Pure read + format: the provisioner fills a `StackReport`, and `render`
//! turns it into the text printed at the end of a run. Kept free of side
//! effects so tests can assert on exact content.

use crate::config;
use serde::Serialize;

/// Final connection information for the provisioned stack.
#[derive(Debug, Clone, Serialize)]
pub struct StackReport {
    /// Database instance identifier
    pub db_identifier: String,
    /// Database endpoint address
    pub db_address: String,
    /// Database endpoint port
    pub db_port: i32,
    /// Tunnel host instance id
    pub instance_id: String,
    /// Tunnel host public IP, if assigned
    pub public_ip: Option<String>,
    /// Tunnel host private IP, if assigned
    pub private_ip: Option<String>,
}

/// Render the human-readable connection instructions.
pub fn render(report: &StackReport) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let rule = "=".repeat(50);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "CONNECTION INFO");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "Database endpoint: {}:{}",
        report.db_address, report.db_port
    );
    let _ = writeln!(out, "EC2 instance:      {}", report.instance_id);
    let _ = writeln!(
        out,
        "Public IP:         {}",
        report.public_ip.as_deref().unwrap_or("(none)")
    );
    let _ = writeln!(
        out,
        "Private IP:        {}",
        report.private_ip.as_deref().unwrap_or("(none)")
    );

    if let Some(public_ip) = report.public_ip.as_deref() {
        let _ = writeln!(out);
        let _ = writeln!(out, "SSH access:");
        let _ = writeln!(
            out,
            "  ssh -i {}.pem ec2-user@{}",
            config::KEY_NAME,
            public_ip
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Application URL:");
        let _ = writeln!(out, "  http://{}:{}", public_ip, config::APP_PORT);
    } else {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "The tunnel host has no public IP; connect from inside the VPC."
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Database client parameters:");
    let _ = writeln!(out, "  host:     {}", report.db_address);
    let _ = writeln!(out, "  port:     {}", report.db_port);
    let _ = writeln!(out, "  user:     {}", config::DB_MASTER_USERNAME);
    let _ = writeln!(out, "  password: {}", config::DB_MASTER_PASSWORD);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> StackReport {
        StackReport {
            db_identifier: config::DB_INSTANCE_ID.to_string(),
            db_address: "db.host".to_string(),
            db_port: 3306,
            instance_id: "i-123".to_string(),
            public_ip: Some("1.2.3.4".to_string()),
            private_ip: Some("172.31.0.5".to_string()),
        }
    }

    #[test]
    fn render_contains_endpoint_port_and_ip() {
        let text = render(&sample_report());

        assert!(text.contains("db.host:3306"));
        assert!(text.contains("i-123"));
        assert!(text.contains("1.2.3.4"));
        assert!(text.contains("172.31.0.5"));
        assert!(text.contains("ssh -i vockey.pem ec2-user@1.2.3.4"));
        assert!(text.contains("http://1.2.3.4:3000"));
    }

    #[test]
    fn render_without_public_ip_omits_ssh_instructions() {
        let report = StackReport {
            public_ip: None,
            ..sample_report()
        };
        let text = render(&report);

        assert!(text.contains("(none)"));
        assert!(!text.contains("ssh -i"));
        assert!(text.contains("connect from inside the VPC"));
    }

    #[test]
    fn report_serializes_to_json() {
        let json = serde_json::to_value(sample_report()).unwrap();

        assert_eq!(json["db_address"], "db.host");
        assert_eq!(json["db_port"], 3306);
        assert_eq!(json["instance_id"], "i-123");
        assert_eq!(json["public_ip"], "1.2.3.4");
    }
}
