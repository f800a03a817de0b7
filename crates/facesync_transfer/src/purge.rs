use facesync_client::{FaceClientError, FaceOps};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub deleted: Vec<String>,
    /// Group ids still listed after the deletes; non-empty means the
    /// verification pass found survivors.
    pub remaining: Vec<String>,
}

/// Delete every person group at the endpoint, then list again to verify the
/// region is empty. An empty initial listing deletes nothing and skips the
/// verification pass.
pub async fn purge_person_groups(client: &dyn FaceOps) -> Result<PurgeReport, FaceClientError> {
    let groups = client.list_person_groups().await?;
    if groups.is_empty() {
        info!("no person groups to delete");
        return Ok(PurgeReport::default());
    }

    let mut deleted = Vec::with_capacity(groups.len());
    for group in groups {
        client.delete_person_group(&group.person_group_id).await?;
        info!(group = %group.person_group_id, "deleted person group");
        deleted.push(group.person_group_id);
    }

    let remaining = client
        .list_person_groups()
        .await?
        .into_iter()
        .map(|group| group.person_group_id)
        .collect();

    Ok(PurgeReport { deleted, remaining })
}

#[cfg(test)]
mod tests {
    use facesync_client::InMemoryFaceClient;

    use super::purge_person_groups;

    #[tokio::test]
    async fn empty_region_performs_zero_deletes() {
        let client = InMemoryFaceClient::new();
        let report = purge_person_groups(&client).await.unwrap();

        assert!(report.deleted.is_empty());
        assert!(report.remaining.is_empty());
        assert!(client.deleted_groups().is_empty());
        assert_eq!(client.list_calls(), 1);
    }

    #[tokio::test]
    async fn deletes_every_listed_group_and_verifies() {
        let client = InMemoryFaceClient::new();
        client.add_group("crew", "Crew");
        client.add_group("visitors", "Visitors");

        let report = purge_person_groups(&client).await.unwrap();

        assert_eq!(
            report.deleted,
            vec!["crew".to_string(), "visitors".to_string()]
        );
        assert!(report.remaining.is_empty());
        assert_eq!(client.deleted_groups().len(), 2);
        assert_eq!(client.list_calls(), 2);
    }
}
