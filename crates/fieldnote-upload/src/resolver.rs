use fieldnote_client::{ApiClient, Conference, NewConference, NewVendor, Result, Vendor};
use fieldnote_telemetry::Logger;
use serde_json::json;

/// Placeholder conference used when none is chosen
pub const UNKNOWN_CONFERENCE: &str = "Unknown Conference";
/// Placeholder vendor used when none is chosen
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

/// Identifiers the caller has, if any
#[derive(Debug, Clone, Default)]
pub struct EntityRequest {
    pub conference_id: Option<String>,
    pub vendor_id: Option<String>,
    /// Name to find or create when a vendor must be resolved; defaults to
    /// [`UNKNOWN_VENDOR`]
    pub preferred_vendor_name: Option<String>,
}

/// Concrete ids an upload can be filed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntities {
    pub conference_id: String,
    pub vendor_id: String,
}

/// Ensures a conference and vendor exist before an upload
///
/// Lookups and creations go through the [`ApiClient`]; their errors are
/// returned unchanged.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    api: ApiClient,
}

impl EntityResolver {
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn logger(&self) -> &Logger {
        self.api.http().logger()
    }

    /// Return ids for an existing conference and vendor, creating
    /// placeholders as needed
    ///
    /// - no conference: adopt the given vendor's conference when it has one,
    ///   else find or create [`UNKNOWN_CONFERENCE`] dated today
    /// - no vendor: find (case-insensitively) or create the preferred vendor
    ///   name under the conference
    /// - vendor belonging to another conference: replaced by the preferred
    ///   vendor under the resolved conference, with a warning
    ///
    /// # Errors
    ///
    /// Returns the underlying client error from any lookup or creation
    pub async fn ensure_conference_and_vendor(&self, request: &EntityRequest) -> Result<ResolvedEntities> {
        let vendor_name = non_blank(request.preferred_vendor_name.as_deref()).unwrap_or(UNKNOWN_VENDOR);
        let conference_id = non_blank(request.conference_id.as_deref());
        let vendor_id = non_blank(request.vendor_id.as_deref());

        let (conference_id, vendor) = match (conference_id, vendor_id) {
            (Some(conference_id), Some(vendor_id)) => {
                (conference_id.to_owned(), Some(self.api.get_vendor(vendor_id).await?))
            }
            (Some(conference_id), None) => (conference_id.to_owned(), None),
            (None, Some(vendor_id)) => {
                let vendor = self.api.get_vendor(vendor_id).await?;
                let conference_id = match vendor.conference_id.clone() {
                    Some(id) => {
                        self.logger().info(
                            format!("using conference {id} of vendor {}", vendor.id),
                            Some(json!({ "conference_id": id, "vendor_id": vendor.id })),
                        );
                        id
                    }
                    None => self.unknown_conference().await?,
                };
                (conference_id, Some(vendor))
            }
            (None, None) => (self.unknown_conference().await?, None),
        };

        let vendor_id = match vendor {
            Some(vendor) if vendor.conference_id.as_deref().is_none_or(|c| c == conference_id) => {
                self.logger().info(
                    format!("keeping vendor {} under conference {conference_id}", vendor.id),
                    Some(json!({ "conference_id": conference_id, "vendor_id": vendor.id })),
                );
                vendor.id
            }
            Some(vendor) => {
                self.logger().warn(
                    format!(
                        "vendor {} belongs to conference {}, not {conference_id}; using '{vendor_name}' instead",
                        vendor.id,
                        vendor.conference_id.as_deref().unwrap_or_default(),
                    ),
                    Some(json!({
                        "vendor_id": vendor.id,
                        "vendor_conference_id": vendor.conference_id,
                        "conference_id": conference_id,
                    })),
                );
                self.vendor_named(&conference_id, vendor_name).await?
            }
            None => self.vendor_named(&conference_id, vendor_name).await?,
        };

        Ok(ResolvedEntities {
            conference_id,
            vendor_id,
        })
    }

    /// Find or create the placeholder conference
    async fn unknown_conference(&self) -> Result<String> {
        let conferences = self.api.list_conferences().await?;

        if let Some(existing) = conferences.iter().find(|c| same_name(&c.name, UNKNOWN_CONFERENCE)) {
            self.logger().info(
                format!("reusing conference '{}' ({})", existing.name, existing.id),
                Some(json!({ "conference_id": existing.id })),
            );
            return Ok(existing.id.clone());
        }

        let today = jiff::Zoned::now().date();
        let created: Conference = self
            .api
            .create_conference(&NewConference {
                name: UNKNOWN_CONFERENCE.to_owned(),
                start_date: today,
                end_date: today,
            })
            .await?;

        self.logger().info(
            format!("created conference '{UNKNOWN_CONFERENCE}' ({})", created.id),
            Some(json!({ "conference_id": created.id, "date": today.to_string() })),
        );

        Ok(created.id)
    }

    /// Find or create a vendor by name under a conference
    async fn vendor_named(&self, conference_id: &str, name: &str) -> Result<String> {
        let vendors = self.api.list_vendors_for_conference(conference_id).await?;

        if let Some(existing) = vendors.iter().find(|v| same_name(&v.name, name)) {
            self.logger().info(
                format!("reusing vendor '{}' ({}) in conference {conference_id}", existing.name, existing.id),
                Some(json!({ "vendor_id": existing.id, "conference_id": conference_id })),
            );
            return Ok(existing.id.clone());
        }

        let created: Vendor = self
            .api
            .create_vendor(&NewVendor {
                name: name.to_owned(),
                conference_id: conference_id.to_owned(),
            })
            .await?;

        self.logger().info(
            format!("created vendor '{name}' ({}) in conference {conference_id}", created.id),
            Some(json!({ "vendor_id": created.id, "conference_id": conference_id })),
        );

        Ok(created.id)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
