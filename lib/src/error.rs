use thiserror::Error;

/// One variant per pipeline stage.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("key pair creation failed: {0}")]
    KeyPair(String),
    #[error("could not save private key: {0}")]
    KeyFile(#[from] std::io::Error),
    #[error("security group creation failed: {0}")]
    SecurityGroup(String),
    #[error("instance launch failed: {0}")]
    Launch(String),
    #[error("instance {id} did not reach running state after {attempts} polls")]
    WaitTimeout { id: String, attempts: usize },
    #[error("address lookup failed: {0}")]
    AddressLookup(String),
    #[error("instance {0} has no public IP address")]
    AddressMissing(String),
    #[error("web application deployment failed: {0}")]
    Deploy(String),
}

#[cfg(test)]
mod tests {
    use super::ProvisionError;

    // This silly test is to make sure we can match
    // specific errors!
    #[test]
    fn timeouts_stay_matchable() {
        let result: Result<(), ProvisionError> = Err(ProvisionError::WaitTimeout {
            id: "i-1".to_string(),
            attempts: 3,
        });
        assert!(matches!(
            result,
            Err(ProvisionError::WaitTimeout { attempts: 3, .. })
        ));
    }
}
