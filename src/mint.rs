use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signer};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    message::Message,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction, system_program, sysvar,
};
use spl_token::{
    instruction::{initialize_mint, mint_to},
    state::Mint,
};

use crate::config::Config;
use crate::error::{Error, MintFailure, Result};
use crate::pda::{
    anchor_discriminator, find_master_edition_pda, find_metadata_pda, find_token_wallet,
    ASSOCIATED_TOKEN_PROGRAM_ID, CANDY_MACHINE_PROGRAM_ID, TOKEN_METADATA_PROGRAM_ID,
};
use crate::rpc::{ChainClient, Commitment};
use crate::utils::shorten;
use crate::wallet::WalletProvider;

/// Freshly generated mint account, signing alongside the wallet.
pub struct MintKeypair {
    keypair: Keypair,
}

impl MintKeypair {
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)
            .map_err(|err| Error::Instruction(format!("mint keypair: {}", err)))?;
        Self::from_seed(&seed)
    }

    pub fn from_seed(seed: &[u8; 32]) -> Result<Self> {
        let secret = SecretKey::from_bytes(seed)
            .map_err(|err| Error::Instruction(format!("mint keypair: {}", err)))?;
        let public = PublicKey::from(&secret);
        Ok(Self {
            keypair: Keypair { secret, public },
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.keypair.public.to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.keypair.sign(message).to_bytes()
    }
}

/// Addresses derived from the new mint for one mint attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct MintAccounts {
    pub mint: Pubkey,
    pub token: Pubkey,
    pub metadata: Pubkey,
    pub master_edition: Pubkey,
}

impl MintAccounts {
    pub fn derive(payer: &Pubkey, mint: &Pubkey) -> Self {
        Self {
            mint: *mint,
            token: find_token_wallet(payer, mint),
            metadata: find_metadata_pda(mint),
            master_edition: find_master_edition_pda(mint),
        }
    }
}

pub fn create_associated_token_account_instruction(
    associated_token_address: &Pubkey,
    payer: &Pubkey,
    wallet_address: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*associated_token_address, false),
            AccountMeta::new_readonly(*wallet_address, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data: vec![],
    }
}

/// The candy machine's `mint_nft` entry point; it takes no arguments.
pub fn mint_nft_instruction(config: &Config, payer: &Pubkey, accounts: &MintAccounts) -> Instruction {
    Instruction {
        program_id: CANDY_MACHINE_PROGRAM_ID,
        accounts: vec![
            AccountMeta::new_readonly(config.candy_machine_config, false),
            AccountMeta::new(config.candy_machine_id, false),
            AccountMeta::new(*payer, true),
            AccountMeta::new(config.treasury, false),
            AccountMeta::new(accounts.metadata, false),
            AccountMeta::new(accounts.mint, false),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new_readonly(*payer, true),
            AccountMeta::new(accounts.master_edition, false),
            AccountMeta::new_readonly(TOKEN_METADATA_PROGRAM_ID, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
            AccountMeta::new_readonly(sysvar::clock::id(), false),
        ],
        data: anchor_discriminator("global", "mint_nft").to_vec(),
    }
}

/// Mint account setup followed by the candy machine call, in submission order.
/// The candy machine call sits at `MINT_NFT_INSTRUCTION`.
pub fn build_instructions(
    config: &Config,
    payer: &Pubkey,
    accounts: &MintAccounts,
    rent_lamports: u64,
) -> Result<Vec<Instruction>> {
    Ok(vec![
        system_instruction::create_account(
            payer,
            &accounts.mint,
            rent_lamports,
            Mint::LEN as u64,
            &spl_token::id(),
        ),
        initialize_mint(&spl_token::id(), &accounts.mint, payer, Some(payer), 0)?,
        create_associated_token_account_instruction(&accounts.token, payer, payer, &accounts.mint),
        mint_to(&spl_token::id(), &accounts.mint, &accounts.token, payer, &[], 1)?,
        mint_nft_instruction(config, payer, accounts),
    ])
}

/// Wire format: compact-u16 signature count, signatures in signer order,
/// then the serialized message.
///
/// Written by hand because `solana-program` ships `Message` but not
/// `Transaction`, and `solana-sdk` does not build for wasm32.
pub fn assemble_transaction(message: &Message, signatures: &[(Pubkey, [u8; 64])]) -> Result<Vec<u8>> {
    let required = message.header.num_required_signatures as usize;
    let mut wire = Vec::with_capacity(3 + required * 64 + 512);
    encode_compact_u16(required as u16, &mut wire);

    for key in message.account_keys.iter().take(required) {
        let (_, signature) = signatures
            .iter()
            .find(|(signer, _)| signer == key)
            .ok_or_else(|| Error::Instruction(format!("missing signature for {}", key)))?;
        wire.extend_from_slice(signature);
    }

    wire.extend(message.serialize());
    Ok(wire)
}

fn encode_compact_u16(mut value: u16, out: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

/// Builds, signs and submits one mint transaction for `payer`.
pub async fn submit_mint(
    client: &dyn ChainClient,
    wallet: &dyn WalletProvider,
    config: &Config,
    payer: &Pubkey,
) -> Result<String> {
    let mint = MintKeypair::generate()?;
    let accounts = MintAccounts::derive(payer, &mint.pubkey());

    let rent = client.minimum_balance_for_rent_exemption(Mint::LEN).await?;
    let instructions = build_instructions(config, payer, &accounts, rent)?;
    log::debug!("Mint accounts: {:?}", accounts);

    let blockhash = client.latest_blockhash().await?;
    let message = Message::new_with_blockhash(&instructions, Some(payer), &blockhash);
    let message_bytes = message.serialize();

    let mint_signature = mint.sign(&message_bytes);
    let wallet_signature = wallet.sign_message(&message_bytes).await?;
    let wire = assemble_transaction(
        &message,
        &[(*payer, wallet_signature), (accounts.mint, mint_signature)],
    )?;

    let signature = client.send_transaction(&wire).await?;
    log::info!("txn: {}", signature);
    Ok(signature)
}

/// Submits a mint and waits for the node to process it.
pub async fn mint(
    client: &dyn ChainClient,
    wallet: &dyn WalletProvider,
    config: &Config,
    payer: &Pubkey,
) -> Result<String> {
    let signature = submit_mint(client, wallet, config, payer).await?;
    client
        .confirm_signature(&signature, Commitment::Processed)
        .await?;
    log::info!("NFT Minted!");
    Ok(signature)
}

/// Busy flag and last outcome of the mint button.
///
/// Advisory only: `begin` refuses a second attempt, but nothing stops a
/// caller from running `mint` concurrently.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MintProgress {
    in_flight: bool,
    notice: Option<String>,
}

impl MintProgress {
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.notice = None;
        true
    }

    pub fn settle(&mut self, outcome: &Result<String>) {
        self.in_flight = false;
        self.notice = Some(match outcome {
            Ok(signature) => format!("NFT Minted! Transaction {}", shorten(signature)),
            Err(err) => {
                let message = MintFailure::classify(err).message();
                log::warn!("{} ({})", message, err);
                message.to_string()
            }
        });
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MINT_NFT_INSTRUCTION;
    use crate::testing::{test_config, FakeChain, FakeWallet};
    use ed25519_dalek::Verifier;
    use futures::executor::block_on;

    #[test]
    fn compact_u16_encoding() {
        let mut out = Vec::new();
        encode_compact_u16(2, &mut out);
        assert_eq!(out, vec![2]);

        out.clear();
        encode_compact_u16(0x80, &mut out);
        assert_eq!(out, vec![0x80, 0x01]);

        out.clear();
        encode_compact_u16(0x3fff, &mut out);
        assert_eq!(out, vec![0xff, 0x7f]);
    }

    #[test]
    fn instructions_are_in_submission_order() {
        let config = test_config();
        let payer = Pubkey::new_unique();
        let mint = MintKeypair::from_seed(&[3u8; 32]).unwrap();
        let accounts = MintAccounts::derive(&payer, &mint.pubkey());

        let ixs = build_instructions(&config, &payer, &accounts, 1_461_600).unwrap();
        let programs: Vec<Pubkey> = ixs.iter().map(|ix| ix.program_id).collect();
        assert_eq!(
            programs,
            vec![
                system_program::id(),
                spl_token::id(),
                ASSOCIATED_TOKEN_PROGRAM_ID,
                spl_token::id(),
                CANDY_MACHINE_PROGRAM_ID,
            ]
        );
        assert_eq!(
            ixs[MINT_NFT_INSTRUCTION as usize].program_id,
            CANDY_MACHINE_PROGRAM_ID
        );
        assert!(ixs[0].accounts[1].is_signer);
        assert_eq!(ixs[0].accounts[1].pubkey, accounts.mint);
    }

    #[test]
    fn mint_nft_wires_required_accounts() {
        let config = test_config();
        let payer = Pubkey::new_unique();
        let accounts = MintAccounts::derive(&payer, &Pubkey::new_unique());
        let ix = mint_nft_instruction(&config, &payer, &accounts);

        assert_eq!(ix.data, anchor_discriminator("global", "mint_nft").to_vec());
        let keys: Vec<Pubkey> = ix.accounts.iter().map(|meta| meta.pubkey).collect();
        assert_eq!(keys[0], config.candy_machine_config);
        assert_eq!(keys[1], config.candy_machine_id);
        assert_eq!(keys[3], config.treasury);
        assert_eq!(keys[4], accounts.metadata);
        assert_eq!(keys[8], accounts.master_edition);
        assert_eq!(keys[13], sysvar::clock::id());
        assert_eq!(ix.accounts.iter().filter(|meta| meta.is_signer).count(), 3);
    }

    #[test]
    fn submitted_transaction_carries_both_signatures() {
        let config = test_config();
        let chain = FakeChain::default();
        let wallet = FakeWallet::trusted();

        let signature = block_on(mint(&chain, &wallet, &config, &wallet.key)).unwrap();
        assert_eq!(signature, "5ignature");
        assert_eq!(*chain.confirmed.borrow(), vec![(signature, Commitment::Processed)]);

        let sent = chain.sent.borrow();
        let wire = &sent[0];
        assert_eq!(wire[0], 2);
        assert_eq!(&wire[1..65], &[1u8; 64][..]);

        let message = &wire[129..];
        // header (3 bytes), key count, then the fee payer and the mint signer
        assert_eq!(&message[4..36], wallet.key.as_ref());
        let mint_key = PublicKey::from_bytes(&message[36..68]).unwrap();
        let mint_signature = ed25519_dalek::Signature::try_from(&wire[65..129]).unwrap();
        assert!(mint_key.verify(message, &mint_signature).is_ok());
    }

    #[test]
    fn rejected_submission_is_classified() {
        let config = test_config();
        let chain = FakeChain::default();
        *chain.send_error.borrow_mut() = Some(Error::program(311));
        let wallet = FakeWallet::trusted();

        let mut progress = MintProgress::default();
        assert!(progress.begin());
        let outcome = block_on(mint(&chain, &wallet, &config, &wallet.key));
        assert!(progress.in_flight());
        progress.settle(&outcome);

        assert!(!progress.in_flight());
        assert_eq!(progress.notice(), Some("SOLD OUT!"));
        assert!(chain.confirmed.borrow().is_empty());
    }

    #[test]
    fn failed_confirmation_clears_the_flag() {
        let config = test_config();
        let chain = FakeChain::default();
        *chain.confirm_error.borrow_mut() =
            Some(Error::TransactionFailed("{\"InstructionError\":[4,\"Custom\"]}".to_string()));
        let wallet = FakeWallet::trusted();

        let mut progress = MintProgress::default();
        progress.begin();
        progress.settle(&block_on(mint(&chain, &wallet, &config, &wallet.key)));
        assert!(!progress.in_flight());
        assert_eq!(progress.notice(), Some("Minting failed! Please try again!"));
    }

    #[test]
    fn second_begin_is_refused_while_in_flight() {
        let mut progress = MintProgress::default();
        assert!(!progress.in_flight());
        assert!(progress.begin());
        assert!(!progress.begin());
        progress.settle(&Ok("5ignatureAbcdefghijk".to_string()));
        assert!(!progress.in_flight());
        assert!(progress.notice().unwrap().starts_with("NFT Minted!"));
        assert!(progress.begin());
        assert_eq!(progress.notice(), None);
    }
}
