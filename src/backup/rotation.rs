// sitebackup/src/backup/rotation.rs
use crate::config::{Account, Site};
use crate::errors::AppError;

/// The database dump is a single-part artifact and always rides on the first
/// account.
pub const DATABASE_ACCOUNT: usize = 0;

/// Quota-spreading policy: codebase part `i` (in discovery order) is uploaded
/// through `site.accounts[i]`, so each storage-limit-sized part lands on its
/// own account.
///
/// Running out of accounts is a hard stop, not a retry: the site produced
/// more parts than it has accounts configured to receive them, and the
/// operator has to add accounts or raise the part size.
pub fn account_for(site: &Site, part_index: usize) -> Result<&Account, AppError> {
    site.accounts
        .get(part_index)
        .ok_or_else(|| AppError::QuotaExhausted {
            site: site.name.clone(),
            parts: part_index + 1,
            accounts: site.accounts.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_with_accounts(count: usize) -> Site {
        Site {
            name: "acme".to_string(),
            docroot: "acme/web".to_string(),
            exclude_paths: vec![],
            parent_folder: None,
            remove_after: None,
            backup_every: None,
            database: None,
            accounts: (0..count)
                .map(|index| Account {
                    index,
                    client_id: format!("client-{index}"),
                    client_secret: format!("secret-{index}"),
                    auth_code: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_part_index_maps_to_account_index() -> anyhow::Result<()> {
        let site = site_with_accounts(3);
        for part_index in 0..3 {
            let account = account_for(&site, part_index)?;
            assert_eq!(account.index, part_index);
        }
        Ok(())
    }

    #[test]
    fn test_part_beyond_accounts_is_quota_exhausted() {
        let site = site_with_accounts(2);
        match account_for(&site, 2) {
            Err(AppError::QuotaExhausted {
                site,
                parts,
                accounts,
            }) => {
                assert_eq!(site, "acme");
                assert_eq!(parts, 3);
                assert_eq!(accounts, 2);
            }
            other => panic!("expected QuotaExhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_no_accounts_always_exhausted() {
        let site = site_with_accounts(0);
        assert!(account_for(&site, 0).is_err());
    }
}
