//! Tests for recovery phrase generation, concealment and confirmation

use wallet_setup::crypto::*;

fn generated() -> RecoveryPhrase {
    MnemonicGenerator::new(*Wordlist::global()).generate().unwrap()
}

fn exact_attempt(phrase: &RecoveryPhrase, mask: &ConcealmentMask) -> ConfirmationAttempt {
    mask.hidden_positions()
        .map(|p| (p, phrase.word(p).unwrap().to_string()))
        .collect()
}

#[test]
fn test_generated_phrases_use_the_wordlist() {
    let wordlist = Wordlist::global();
    for _ in 0..50 {
        let phrase = generated();
        assert_eq!(phrase.len(), PHRASE_WORDS);
        assert!(phrase.words().all(|w| wordlist.contains(w)));
    }
}

#[test]
fn test_independent_phrases_differ() {
    let a = generated();
    let b = generated();
    assert!(!a.words().eq(b.words()));
}

#[test]
fn test_concealment_invariant_holds_for_every_policy() {
    let phrase = generated();
    let mut policies = vec![ConcealmentPolicy::default()];
    policies.extend((1..PHRASE_WORDS).map(ConcealmentPolicy::FixedCount));
    policies.extend((0..20).map(|seed| ConcealmentPolicy::Seeded { count: 8, seed }));
    policies.extend([0.01, 0.1, 0.5, 0.9, 0.99].map(ConcealmentPolicy::Ratio));

    for policy in &policies {
        let mask = conceal(&phrase, policy).unwrap();
        assert!(mask.hidden_count() > 0, "{:?}", policy);
        assert!(mask.hidden_count() < PHRASE_WORDS, "{:?}", policy);
    }
}

#[test]
fn test_exact_retype_confirms() {
    let phrase = generated();
    let mask = conceal(&phrase, &ConcealmentPolicy::default()).unwrap();
    let attempt = exact_attempt(&phrase, &mask);

    assert!(is_submittable(&attempt, &mask));
    assert_eq!(validate(&phrase, &mask, &attempt), ConfirmationResult::Confirmed);
}

#[test]
fn test_single_character_change_flags_only_that_position() {
    let phrase = generated();
    let mask = conceal(&phrase, &ConcealmentPolicy::Seeded { count: 6, seed: 5 }).unwrap();

    for position in mask.hidden_positions() {
        let mut attempt = exact_attempt(&phrase, &mask);
        let mut altered = phrase.word(position).unwrap().to_string();
        let last = altered.pop().unwrap();
        altered.push(if last == 'z' { 'a' } else { 'z' });
        attempt.set(position, altered);

        assert_eq!(
            validate(&phrase, &mask, &attempt),
            ConfirmationResult::Rejected(vec![position])
        );
    }
}

#[test]
fn test_rejection_serializes_positions_only() {
    let result = ConfirmationResult::Rejected(vec![5]);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json, serde_json::json!({ "status": "rejected", "failed_positions": [5] }));
}
