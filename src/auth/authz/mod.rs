/*
 *     Copyright (C) 2023  Fritz Ochsmann
 *
 *     This program is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU Affero General Public License as published
 *     by the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     This program is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU Affero General Public License for more details.
 *
 *     You should have received a copy of the GNU Affero General Public License
 *     along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use crate::prelude::*;

/// Gate applied before a task is updated or deleted.
pub trait Authorize {
    /// Permitted iff the requester created the task or is an admin.
    fn authorize_mutation(&self, created_by: &Id) -> Result<()>;
}

impl Authorize for Identity {
    #[instrument(skip_all, fields(requester = %self.id(), owner = %created_by))]
    fn authorize_mutation(&self, created_by: &Id) -> Result<()> {
        if self.id().eq(created_by) || self.is_admin() {
            Ok(())
        } else {
            Err(ApplicationError::Forbidden(
                "Not authorized to modify this task".to_owned(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::definitions::user::Role;

    #[test]
    fn test_owner_and_admin() {
        let owner = Id::new(("user", "owner"));
        let other = Id::new(("user", "other"));

        assert!(Identity::new(owner.clone(), Role::User)
            .authorize_mutation(&owner)
            .is_ok());
        assert!(Identity::new(other.clone(), Role::Admin)
            .authorize_mutation(&owner)
            .is_ok());
        assert!(matches!(
            Identity::new(other, Role::User).authorize_mutation(&owner),
            Err(ApplicationError::Forbidden(_))
        ));
    }
}
