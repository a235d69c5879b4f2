use diesel::prelude::*;

use super::models::{NewUser, Team, User};
use super::schema::{memberships, teams, users};
use super::{Store, StorageError};

impl Store {
    /// Inserts a user; a duplicate email or nickname surfaces as `Conflict`.
    pub async fn create_user(
        &self,
        email: &str,
        nickname: &str,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let email = email.to_string();
        let nickname = nickname.to_string();
        let password_hash = password_hash.to_string();
        self.write_tx(move |conn| {
            let user = diesel::insert_into(users::table)
                .values(&NewUser {
                    email: &email,
                    nickname: &nickname,
                    password_hash: &password_hash,
                })
                .returning(User::as_returning())
                .get_result::<User>(conn)?;
            Ok(user)
        })
        .await
        .map_err(|e| e.unique_as_conflict("user with this email or nickname already exists"))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let email = email.to_string();
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::email.eq(&email))
                .select(User::as_select())
                .first::<User>(conn)
                .optional()?)
        })
        .await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, StorageError> {
        Ok(self.find_user_by_email(email).await?.is_some())
    }

    pub async fn user_exists(&self, user_id: i32) -> Result<bool, StorageError> {
        self.with_conn(move |conn| {
            let count: i64 = users::table
                .filter(users::id.eq(user_id))
                .count()
                .get_result(conn)?;
            Ok(count > 0)
        })
        .await
    }

    /// The user plus every team it belongs to, ordered by team id.
    pub async fn user_with_teams(&self, user_id: i32) -> Result<(User, Vec<Team>), StorageError> {
        self.with_conn(move |conn| {
            let user = users::table
                .filter(users::id.eq(user_id))
                .select(User::as_select())
                .first::<User>(conn)
                .optional()?
                .ok_or_else(|| StorageError::not_found("user not found"))?;
            let user_teams = memberships::table
                .inner_join(teams::table)
                .filter(memberships::user_id.eq(user_id))
                .order(teams::id.asc())
                .select(Team::as_select())
                .load::<Team>(conn)?;
            Ok((user, user_teams))
        })
        .await
    }

    /// Profile lookup restricted to the actor's own account.
    pub async fn get_user_for(&self, actor: i32, user_id: i32) -> Result<User, StorageError> {
        self.with_conn(move |conn| {
            let user = users::table
                .filter(users::id.eq(user_id))
                .select(User::as_select())
                .first::<User>(conn)
                .optional()?
                .ok_or_else(|| StorageError::not_found("user not found"))?;
            if user.id != actor {
                return Err(StorageError::forbidden("no access to this user"));
            }
            Ok(user)
        })
        .await
    }
}
