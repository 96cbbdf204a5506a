/// Validation logic for transactions separated from type definitions
use crate::crypto::{Secp256k1Signer, SigningService};
use crate::error::ValidationFailure;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Checks signer coverage, local conservation and every signature.
    ///
    /// Reward transactions (no inputs) skip the local conservation check;
    /// their funding is bounded by the block reward instead.
    pub fn validate_with<S: SigningService + ?Sized>(
        &self,
        service: &S,
    ) -> Result<(), ValidationFailure> {
        if self.signatures.len() != self.required_signers.len() {
            return Err(ValidationFailure::SignatureCountMismatch {
                signatures: self.signatures.len(),
                required: self.required_signers.len(),
            });
        }

        let (Some(input), Some(output)) = (self.total_input(), self.total_output()) else {
            return Err(ValidationFailure::AmountOverflow(format!(
                "totals of transaction {} do not fit",
                self.hash_str()
            )));
        };
        if !self.is_reward() && input < output {
            return Err(ValidationFailure::InsufficientInput {
                input: input.to_string(),
                output: output.to_string(),
            });
        }

        let message = self.signable_message();
        for signer in &self.required_signers {
            let signature = self
                .signatures
                .get(signer)
                .ok_or_else(|| ValidationFailure::MissingSignature(signer.to_hex()))?;
            if !service.verify(&message, signature, signer) {
                return Err(ValidationFailure::InvalidSignature(signer.to_hex()));
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationFailure> {
        self.validate_with(&Secp256k1Signer)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn is_valid_with<S: SigningService + ?Sized>(&self, service: &S) -> bool {
        self.validate_with(service).is_ok()
    }
}
