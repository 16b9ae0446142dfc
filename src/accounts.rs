use chrono::{DateTime, Months, Utc};
use std::sync::Arc;

use crate::{
    access::{AccessError, Principal},
    codec::{CredentialCodec, DECOY_CIPHERTEXT},
    error::{AppError, Result},
    models::{
        Account, AccountView, LoginRequest, LoginResponse, NewAccount, RegisterRequest,
        UpdateAccountRequest,
    },
    store::{
        Collection, Filter, FindQuery, Measure, MonthlyTotal, RecordStoreState, from_document,
        from_documents, to_document,
    },
    token::TokenService,
    validation::{validate_email, validate_password, validate_username},
};

/// How many accounts `list(newest = true)` returns.
pub const NEWEST_LIMIT: usize = 5;

/// The start of a window reaching `months` calendar months back from now.
pub fn months_ago(months: u32) -> DateTime<Utc> {
    let now = Utc::now();
    now.checked_sub_months(Months::new(months)).unwrap_or(now)
}

/// AccountDirectory
///
/// Registration, login and account maintenance. Composes the credential codec, the
/// token service and the record store; holds no state of its own.
#[derive(Clone)]
pub struct AccountDirectory {
    store: RecordStoreState,
    codec: Arc<CredentialCodec>,
    tokens: Arc<TokenService>,
}

impl AccountDirectory {
    pub fn new(
        store: RecordStoreState,
        codec: Arc<CredentialCodec>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            codec,
            tokens,
        }
    }

    /// register
    ///
    /// Encrypts the password and persists a new, non-admin account. Uniqueness of
    /// username and email is the store's job; a clash surfaces as a persistence error.
    pub async fn register(&self, request: RegisterRequest) -> Result<Account> {
        validate_username(&request.username)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        let draft = NewAccount {
            username: request.username,
            email: request.email,
            password: self.codec.encrypt(&request.password)?,
            is_admin: false,
        };

        let doc = self
            .store
            .create(Collection::Accounts, to_document(&draft)?)
            .await?;
        let account: Account = from_document(doc)?;

        tracing::info!(account_id = %account.id, "account registered");
        Ok(account)
    }

    /// login
    ///
    /// Verifies a username/password pair and issues a session token. An unknown username
    /// and a wrong password fail identically, so callers cannot probe for accounts.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let filter = Filter::new().eq("username", request.username.as_str());
        let Some(doc) = self.store.find_one(Collection::Accounts, &filter).await? else {
            self.codec.matches(DECOY_CIPHERTEXT, &request.password);
            tracing::info!("login rejected");
            return Err(AppError::InvalidCredentials);
        };
        let account: Account = from_document(doc)?;

        if !self.codec.matches(&account.password, &request.password) {
            tracing::info!(account_id = %account.id, "login rejected");
            return Err(AppError::InvalidCredentials);
        }

        let access_token = self.tokens.issue(&account.id, account.is_admin)?;
        tracing::info!(account_id = %account.id, "login succeeded");

        Ok(LoginResponse {
            account: account.into(),
            access_token,
        })
    }

    /// update
    ///
    /// Applies a partial update. A new password is re-encrypted; `isAdmin` may only be
    /// changed by an administrator.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        mut request: UpdateAccountRequest,
    ) -> Result<AccountView> {
        if request.is_admin.is_some() && !principal.is_admin {
            return Err(AccessError::Forbidden.into());
        }
        if let Some(username) = &request.username {
            validate_username(username)?;
        }
        if let Some(email) = &request.email {
            validate_email(email)?;
        }
        if let Some(password) = request.password.take() {
            validate_password(&password)?;
            request.password = Some(self.codec.encrypt(&password)?);
        }

        let doc = self
            .store
            .find_by_id_and_update(Collection::Accounts, id, to_document(&request)?)
            .await?
            .ok_or(AppError::NotFound)?;

        Ok(from_document::<Account>(doc)?.into())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .find_by_id_and_delete(Collection::Accounts, id)
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::info!(account_id = %id, "account deleted");
        Ok(())
    }

    pub async fn find(&self, id: &str) -> Result<AccountView> {
        let doc = self
            .store
            .find_by_id(Collection::Accounts, id)
            .await?
            .ok_or(AppError::NotFound)?;
        Ok(from_document::<Account>(doc)?.into())
    }

    /// Lists accounts, or only the five most recently created when `newest` is set.
    pub async fn list(&self, newest: bool) -> Result<Vec<AccountView>> {
        let query = if newest {
            FindQuery::newest(NEWEST_LIMIT)
        } else {
            FindQuery::all()
        };
        let docs = self.store.find(Collection::Accounts, &query).await?;
        Ok(from_documents::<Account>(docs)?
            .into_iter()
            .map(AccountView::from)
            .collect())
    }

    /// Number of sign-ups per calendar month over the last year.
    pub async fn signups_by_month(&self) -> Result<Vec<MonthlyTotal>> {
        Ok(self
            .store
            .monthly_totals(Collection::Accounts, months_ago(12), Measure::Count)
            .await?)
    }
}
