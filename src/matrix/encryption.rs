//! Matrix client login, restore and encryption setup.
//!
//! The bot participates in encrypted rooms, so a working client needs more
//! than a login: cross-signing keys, key backup and secret storage all have
//! to be in place. [`setup_client`] hides the two paths behind one call:
//!
//! - **no stored session**: log in with the password, bootstrap
//!   cross-signing, enable recovery with the passphrase, then persist the
//!   session for next time
//! - **stored session found**: restore it and import the secrets from
//!   secret storage with the passphrase
//!
//! Both paths end with the same validation: recovery enabled and the device
//! verified.

use anyhow::bail;
use log::{debug, error, info};
use matrix_sdk::{
    Client,
    encryption::{
        BackupDownloadStrategy, EncryptionSettings,
        recovery::{RecoveryError, RecoveryState},
    },
    ruma::{OwnedUserId, api::client::uiaa},
};

use crate::matrix::{UserCredentials, session::SessionStore};

/// Bootstraps cross-signing if the account does not have it yet.
///
/// The first attempt runs without authentication; if the homeserver asks
/// for user-interactive auth, the call is retried with the account password.
async fn bootstrap_cross_signing(
    client: &Client,
    user_credentials: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("setting up cross signing");

    if let Err(e) = client
        .encryption()
        .bootstrap_cross_signing_if_needed(None)
        .await
    {
        let response = e.as_uiaa_response().unwrap();
        let mut password = uiaa::Password::new(
            uiaa::UserIdentifier::UserIdOrLocalpart(user_credentials.user_id.to_owned()),
            user_credentials.password.to_owned(),
        );
        password.session = response.session.clone();

        client
            .encryption()
            .bootstrap_cross_signing(Some(uiaa::AuthData::Password(password)))
            .await?;

        debug!("cross signing set up");
        return Ok(());
    }

    debug!("cross signing already set up");
    Ok(())
}

/// Enables key backup and secret storage, protected by the passphrase.
///
/// A backup already existing on the server is fine; anything else is fatal
/// for the setup.
async fn enable_recovery(
    client: &Client,
    user_credentials: &UserCredentials,
) -> Result<(), anyhow::Error> {
    debug!("enabling recovery");

    match client
        .encryption()
        .recovery()
        .enable()
        .with_passphrase(&user_credentials.passphrase)
        .await
    {
        Ok(_) => debug!("recovery enabled"),
        Err(RecoveryError::BackupExistsOnServer) => debug!("recovery already enabled"),
        Err(e) => bail!("error enabling recovery: {:?}", e),
    }

    Ok(())
}

/// Validates that recovery is enabled and the device is verified.
async fn encryption_check(client: &Client) -> Result<(), anyhow::Error> {
    if client.encryption().recovery().state() != RecoveryState::Enabled {
        error!("recovery is not enabled after enabling it");
        return Err(anyhow::anyhow!("recovery is disabled after enabling it"));
    }

    // Client is logged in so the own device is always present
    let device = client.encryption().get_own_device().await?.unwrap();
    if !device.is_verified() {
        error!("device is not verified after setting up encryption");
        return Err(anyhow::anyhow!(
            "device is not verified after setting up encryption"
        ));
    }

    Ok(())
}

/// Creates a new session: login, encryption bootstrap, persistence.
async fn create_session(
    user_credentials: &UserCredentials,
    session_store: &SessionStore,
) -> Result<Client, anyhow::Error> {
    let encryption_settings = EncryptionSettings {
        auto_enable_cross_signing: true,
        backup_download_strategy: BackupDownloadStrategy::default(),
        auto_enable_backups: true,
    };

    let bot_user: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let client = Client::builder()
        .sqlite_store(
            session_store.sqlite_path(),
            Some(&user_credentials.passphrase),
        )
        .with_encryption_settings(encryption_settings)
        .server_name(bot_user.server_name())
        .build()
        .await?;

    debug!("matrix client created");

    client
        .matrix_auth()
        .login_username(bot_user, &user_credentials.password)
        .initial_device_display_name("pigeon bot")
        .send()
        .await?;

    bootstrap_cross_signing(&client, user_credentials).await?;
    enable_recovery(&client, user_credentials).await?;

    // Recover all secrets using the passphrase
    debug!("trying to recover secrets");
    client
        .encryption()
        .recovery()
        .recover(&user_credentials.passphrase)
        .await?;
    debug!("secrets recovered");

    encryption_check(&client).await?;

    // Persist so the next start can skip the login
    let auth_session = client.matrix_auth().session().unwrap();
    if let Err(err) = session_store.persist_auth_session(&auth_session).await {
        error!("error persisting auth session: {:?}", err);
        return Err(anyhow::anyhow!(
            "error persisting auth session: {:?}",
            err
        ));
    }

    info!("matrix client setup complete");
    Ok(client)
}

/// Restores a previously persisted session and its encryption secrets.
async fn restore_session(
    user_credentials: &UserCredentials,
    session_store: &SessionStore,
) -> Result<Client, anyhow::Error> {
    info!("restoring matrix session from disk");

    let bot_user: OwnedUserId = user_credentials.user_id.clone().try_into()?;
    let client = Client::builder()
        .server_name(bot_user.server_name())
        .sqlite_store(
            session_store.sqlite_path(),
            Some(&user_credentials.passphrase),
        )
        .build()
        .await?;

    client
        .restore_session(session_store.auth_session().unwrap().clone())
        .await?;

    // Import secrets from secret storage
    let secret_store = client
        .encryption()
        .secret_storage()
        .open_secret_store(&user_credentials.passphrase)
        .await?;
    secret_store.import_secrets().await?;

    encryption_check(&client).await?;

    info!("matrix session restored successfully");
    Ok(client)
}

/// Returns a fully set up client, restoring the stored session when one
/// exists and logging in from scratch otherwise.
pub async fn setup_client(
    user_credentials: &UserCredentials,
    session_store: &SessionStore,
) -> Result<Client, anyhow::Error> {
    info!(
        "setting up matrix client for user {}",
        user_credentials.user_id
    );

    if session_store.has_session() {
        restore_session(user_credentials, session_store).await
    } else {
        create_session(user_credentials, session_store).await
    }
}
