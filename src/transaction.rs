//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::error::{ChainError, ValidationFailure};

    fn amount(value: f64) -> Amount {
        Amount::from_num(value)
    }

    #[test]
    fn test_simple_transfer_is_valid() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(1.0)).unwrap();
        tx.add_output(payee.identity(), amount(1.0)).unwrap();
        tx.sign(&payer).unwrap();

        assert!(tx.is_valid());
        assert_eq!(tx.required_signers(), &[payer.identity()]);
        assert_eq!(tx.fee(), Some(Amount::ZERO));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(1.0)).unwrap();
        tx.add_output(payee.identity(), amount(1.0)).unwrap();
        tx.sign(&payee).unwrap();

        assert!(matches!(
            tx.validate(),
            Err(ValidationFailure::MissingSignature(_))
        ));
    }

    #[test]
    fn test_overspend_is_invalid_despite_good_signature() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(1.0)).unwrap();
        tx.add_output(payee.identity(), amount(2.0)).unwrap();
        tx.sign(&payer).unwrap();

        assert!(matches!(
            tx.validate(),
            Err(ValidationFailure::InsufficientInput { .. })
        ));
    }

    #[test]
    fn test_escrow_requires_arbiter() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();
        let arbiter = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(1.2)).unwrap();
        tx.add_output(payee.identity(), amount(1.1)).unwrap();
        tx.add_required(arbiter.identity());
        tx.sign(&payer).unwrap();

        assert_eq!(
            tx.validate(),
            Err(ValidationFailure::SignatureCountMismatch {
                signatures: 1,
                required: 2
            })
        );

        tx.sign(&arbiter).unwrap();
        assert!(tx.is_valid());
    }

    #[test]
    fn test_signing_order_does_not_matter() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();
        let arbiter = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(3.0)).unwrap();
        tx.add_output(payee.identity(), amount(2.5)).unwrap();
        tx.add_required(arbiter.identity());
        tx.sign(&arbiter).unwrap();
        tx.sign(&payer).unwrap();

        assert!(tx.is_valid());
    }

    #[test]
    fn test_negative_amount_leaves_transaction_untouched() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        let before = tx.clone();

        let result = tx.add_input(payer.identity(), amount(-1.0));
        assert!(matches!(result, Err(ChainError::NegativeAmount(_))));
        let result = tx.add_output(payee.identity(), amount(-1.0));
        assert!(matches!(result, Err(ChainError::NegativeAmount(_))));

        assert_eq!(tx, before);
        assert!(tx.required_signers().is_empty());
    }

    #[test]
    fn test_changing_outputs_after_signing_breaks_signature() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(2.0)).unwrap();
        tx.add_output(payee.identity(), amount(1.0)).unwrap();
        tx.sign(&payer).unwrap();
        tx.add_output(payee.identity(), amount(0.5)).unwrap();

        assert!(matches!(
            tx.validate(),
            Err(ValidationFailure::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_reward_transaction_needs_no_signature() {
        let miner = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_output(miner.identity(), amount(25.0)).unwrap();

        assert!(tx.is_reward());
        assert!(tx.is_valid());
        assert_eq!(tx.fee(), Some(amount(-25.0)));
    }

    #[test]
    fn test_repeated_payer_is_required_once() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(1.0)).unwrap();
        tx.add_input(payer.identity(), amount(0.5)).unwrap();
        tx.add_output(payee.identity(), amount(1.5)).unwrap();
        tx.sign(&payer).unwrap();

        assert_eq!(tx.required_signers().len(), 1);
        assert_eq!(tx.total_input(), Some(amount(1.5)));
        assert!(tx.is_valid());
    }

    #[test]
    fn test_signable_message_excludes_signatures() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), amount(1.0)).unwrap();
        tx.add_output(payee.identity(), amount(1.0)).unwrap();
        let message = tx.signable_message();
        let unsigned_hash = tx.hash();

        tx.sign(&payer).unwrap();
        assert_eq!(tx.signable_message(), message);
        assert_ne!(tx.hash(), unsigned_hash);
    }

    #[test]
    fn test_overflowing_totals_are_invalid_not_fatal() {
        let payer = KeyPair::generate().unwrap();
        let payee = KeyPair::generate().unwrap();

        let mut tx = Transaction::new();
        tx.add_input(payer.identity(), Amount::MAX).unwrap();
        tx.add_input(payer.identity(), Amount::MAX).unwrap();
        tx.add_output(payee.identity(), amount(1.0)).unwrap();
        tx.sign(&payer).unwrap();

        assert_eq!(tx.total_input(), None);
        assert_eq!(tx.fee(), None);
        assert!(!tx.is_valid());
        assert!(matches!(
            tx.validate(),
            Err(ValidationFailure::AmountOverflow(_))
        ));
    }
}
