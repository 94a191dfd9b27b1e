//! Fixed stack parameters
//!
//! Every knob of the provisioned stack is a constant: the tool's surface is
//! "run it", not "configure it". Only the region is selectable on the CLI.

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Identifier of the RDS database instance
pub const DB_INSTANCE_ID: &str = "dbstack-mariadb";

/// Value of the `Name` tag on the EC2 tunnel host
pub const INSTANCE_NAME: &str = "dbstack-tunnel";

/// Key pair used for SSH access to the tunnel host
pub const KEY_NAME: &str = "vockey";

/// Database engine
pub const DB_ENGINE: &str = "mariadb";

/// Database instance class
pub const DB_INSTANCE_CLASS: &str = "db.t3.micro";

/// Allocated database storage in GiB
pub const DB_ALLOCATED_STORAGE_GIB: i32 = 20;

/// Database storage type
pub const DB_STORAGE_TYPE: &str = "gp2";

/// Database master username
pub const DB_MASTER_USERNAME: &str = "admin";

/// Database master password (development stack, deliberately hard-coded)
pub const DB_MASTER_PASSWORD: &str = "dbstack-dev-password";

/// EC2 instance type for the tunnel host
pub const COMPUTE_INSTANCE_TYPE: &str = "t2.micro";

/// SSH ingress port, open to all sources
pub const SSH_PORT: i32 = 22;

/// Application ingress port, open to all sources
pub const APP_PORT: i32 = 3000;

/// Database ingress port, restricted to members of the security group
pub const DB_PORT: i32 = 3306;

/// AMI name pattern for the tunnel host image lookup
pub const AMI_NAME_PATTERN: &str = "al2023-ami-2023.*";

/// AMI architecture for the tunnel host image lookup
pub const AMI_ARCHITECTURE: &str = "x86_64";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingress_ports_are_distinct() {
        assert_ne!(SSH_PORT, APP_PORT);
        assert_ne!(APP_PORT, DB_PORT);
        assert_ne!(SSH_PORT, DB_PORT);
    }

    #[test]
    fn db_identifier_is_valid_rds_name() {
        // RDS identifiers: 1-63 chars, letters/digits/hyphens, starts with a letter
        assert!(DB_INSTANCE_ID.len() <= 63);
        assert!(DB_INSTANCE_ID
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic()));
        assert!(DB_INSTANCE_ID
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-'));
        assert!(!DB_INSTANCE_ID.ends_with('-'));
    }
}
