use chain_whitelist::config::PolicyConfig;
use chain_whitelist::crypto::{hash, Ecies, Hashable, KeyPair};
use chain_whitelist::keystore::MemoryKeyStore;
use chain_whitelist::policy::{PolicyUpdater, Whitelist};
use chain_whitelist::transaction::{
    build_registration_payload, AssetId, MemoryCoinsView, OutPoint, Script, Transaction, TxIn,
    TxOut,
};

fn rotation_script(pair: &KeyPair) -> Script {
    let mut marker = pair.get_public_key().to_bytes().to_vec();
    marker.reverse();
    Script::Multisig {
        required: 1,
        operands: vec![vec![2; 33], vec![3; 33], marker, vec![4; 33]],
    }
}

fn registration_tx(payload: Vec<u8>) -> Transaction {
    Transaction::new(
        vec![TxIn::new(OutPoint::new(hash(b"funding"), 0))],
        vec![TxOut::new(AssetId::base(), Script::RegisterAddress(payload))],
    )
}

#[test]
fn rotation_then_onboarding_then_revocation() {
    let whitelist = Whitelist::new(AssetId::base());
    let authority = KeyPair::generate();
    let mut keystore = MemoryKeyStore::new();
    keystore.insert(authority.get_private_key().clone());

    // An on-chain rotation marker authorizes the KYC key
    let rotation_tx = Transaction::new(
        vec![TxIn::new(OutPoint::new(hash(b"coin"), 0))],
        vec![TxOut::new(AssetId::base(), rotation_script(&authority))],
    );
    let rotation_prevout = OutPoint::new(rotation_tx.hash(), 0);
    let mut view = MemoryCoinsView::new();
    view.insert(
        rotation_prevout.clone(),
        rotation_tx.outputs[0].clone(),
    );
    whitelist.update(&rotation_tx, &view).unwrap();
    assert!(whitelist.is_kyc(&authority.key_id()));

    // A client onboards an address under the freshly authorized key
    let client = KeyPair::generate();
    let onboarded = KeyPair::generate();
    let payload = build_registration_payload(
        &client,
        authority.get_public_key(),
        &[(onboarded.key_id(), onboarded.get_public_key().clone())],
    );
    assert!(whitelist.register_address(&registration_tx(payload), &view, &keystore, None));
    assert!(whitelist.is_whitelisted(&onboarded.key_id()));
    assert_eq!(
        whitelist.lookup_kyc_key(&onboarded.key_id()),
        Some(authority.key_id())
    );

    // Spending the rotation marker revokes the key
    let revoke_tx = Transaction::new(vec![TxIn::new(rotation_prevout)], vec![]);
    whitelist.update(&revoke_tx, &view).unwrap();
    assert!(!whitelist.is_kyc(&authority.key_id()));

    // Another registration under the revoked key is refused
    let other = KeyPair::generate();
    let payload = build_registration_payload(
        &client,
        authority.get_public_key(),
        &[(other.key_id(), other.get_public_key().clone())],
    );
    assert!(!whitelist.register_address(&registration_tx(payload), &view, &keystore, None));
    assert!(!whitelist.is_whitelisted(&other.key_id()));

    // The earlier onboarding is not retroactively removed
    assert!(whitelist.is_whitelisted(&onboarded.key_id()));
}

#[test]
fn batch_onboarding_registers_all_entries() {
    let config = PolicyConfig::new(AssetId::base());
    let whitelist = Whitelist::from_config(&config);
    let authority = KeyPair::generate();
    whitelist.add_kyc(authority.key_id());
    let mut keystore = MemoryKeyStore::new();
    keystore.insert(authority.get_private_key().clone());

    let client = KeyPair::generate();
    let members: Vec<KeyPair> = (0..5).map(|_| KeyPair::generate()).collect();
    let entries: Vec<_> = members
        .iter()
        .map(|m| (m.key_id(), m.get_public_key().clone()))
        .collect();

    let payload = build_registration_payload(&client, authority.get_public_key(), &entries);
    assert!(whitelist.register_address(
        &registration_tx(payload),
        &MemoryCoinsView::new(),
        &keystore,
        config.contract()
    ));
    assert_eq!(whitelist.len(), 5);
    for member in &members {
        assert!(whitelist.is_whitelisted(&member.key_id()));
    }
}

// A node holding neither party's key recovers the counterparty from the
// transaction's inputs when exactly one onboarded sender is involved.
#[test]
fn non_whitelisting_node_decrypts_via_sender_inference() {
    let whitelist = Whitelist::new(AssetId::base());
    let authority = KeyPair::generate();
    whitelist.add_kyc(authority.key_id());

    // The sender was onboarded earlier
    let sender = KeyPair::generate();
    whitelist
        .add_derived(
            sender.key_id(),
            sender.get_public_key(),
            Some(&authority.key_id()),
            None,
        )
        .unwrap();

    // The local node is the KYC authority but the payload header claims a
    // different, unknown authority, so header-based resolution fails
    let mut keystore = MemoryKeyStore::new();
    keystore.insert(authority.get_private_key().clone());
    keystore.set_kyc_pub_key(authority.get_public_key().clone());

    let decoy = KeyPair::generate();
    let onboarded = KeyPair::generate();
    let channel = Ecies::new(sender.get_private_key(), authority.get_public_key());
    let mut plaintext = Vec::new();
    plaintext.extend_from_slice(onboarded.key_id().as_bytes());
    plaintext.extend_from_slice(&onboarded.get_public_key().to_bytes());

    let mut payload = Vec::new();
    payload.extend_from_slice(&decoy.get_public_key().to_bytes());
    payload.extend_from_slice(&sender.get_public_key().to_bytes());
    payload.extend_from_slice(&channel.iv());
    payload.extend_from_slice(&channel.encrypt(&plaintext));

    let funding = OutPoint::new(hash(b"sender coin"), 0);
    let mut view = MemoryCoinsView::new();
    view.insert(
        funding.clone(),
        TxOut::new(AssetId::base(), Script::PayToPubKeyHash(sender.key_id())),
    );
    let tx = Transaction::new(
        vec![TxIn::new(funding)],
        vec![TxOut::new(AssetId::base(), Script::RegisterAddress(payload))],
    );

    assert!(whitelist.register_address(&tx, &view, &keystore, None));
    assert!(whitelist.is_whitelisted(&onboarded.key_id()));
    assert_eq!(
        whitelist.lookup_kyc_key(&onboarded.key_id()),
        Some(authority.key_id())
    );
}

#[test]
fn ambiguous_sender_inference_is_rejected() {
    let whitelist = Whitelist::new(AssetId::base());
    let authority = KeyPair::generate();
    whitelist.add_kyc(authority.key_id());

    // Two distinct onboarded senders fund the transaction
    let senders = [KeyPair::generate(), KeyPair::generate()];
    let mut view = MemoryCoinsView::new();
    let mut inputs = Vec::new();
    for (index, sender) in senders.iter().enumerate() {
        whitelist
            .add_derived(
                sender.key_id(),
                sender.get_public_key(),
                Some(&authority.key_id()),
                None,
            )
            .unwrap();
        let funding = OutPoint::new(hash(b"coins"), index as u32);
        view.insert(
            funding.clone(),
            TxOut::new(AssetId::base(), Script::PayToPubKeyHash(sender.key_id())),
        );
        inputs.push(TxIn::new(funding));
    }

    let mut keystore = MemoryKeyStore::new();
    keystore.insert(authority.get_private_key().clone());
    keystore.set_kyc_pub_key(authority.get_public_key().clone());

    let decoy = KeyPair::generate();
    let onboarded = KeyPair::generate();
    let channel = Ecies::new(senders[0].get_private_key(), authority.get_public_key());
    let mut plaintext = Vec::new();
    plaintext.extend_from_slice(onboarded.key_id().as_bytes());
    plaintext.extend_from_slice(&onboarded.get_public_key().to_bytes());

    let mut payload = Vec::new();
    payload.extend_from_slice(&decoy.get_public_key().to_bytes());
    payload.extend_from_slice(&senders[0].get_public_key().to_bytes());
    payload.extend_from_slice(&channel.iv());
    payload.extend_from_slice(&channel.encrypt(&plaintext));

    let tx = Transaction::new(
        inputs,
        vec![TxOut::new(AssetId::base(), Script::RegisterAddress(payload))],
    );

    assert!(!whitelist.register_address(&tx, &view, &keystore, None));
    assert!(!whitelist.is_whitelisted(&onboarded.key_id()));
}

#[test]
fn tampered_ciphertext_registers_nothing() {
    let whitelist = Whitelist::new(AssetId::base());
    let authority = KeyPair::generate();
    whitelist.add_kyc(authority.key_id());
    let mut keystore = MemoryKeyStore::new();
    keystore.insert(authority.get_private_key().clone());

    let client = KeyPair::generate();
    let onboarded = KeyPair::generate();
    let mut payload = build_registration_payload(
        &client,
        authority.get_public_key(),
        &[(onboarded.key_id(), onboarded.get_public_key().clone())],
    );

    // Flip a ciphertext byte; the garbage plaintext fails every validity
    // check instead of registering anything
    let last = payload.len() - 1;
    payload[last] ^= 0xFF;
    assert!(!whitelist.register_address(
        &registration_tx(payload),
        &MemoryCoinsView::new(),
        &keystore,
        None
    ));
    assert!(whitelist.is_empty());
}
