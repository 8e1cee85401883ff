//! Page iteration over the tag listing API

use tracing::trace;

use crate::clients::{
    ClientError, ClientResult, GetResourcesInput, GetResourcesOutput, ResourceGroupsTaggingApi,
};

/// Largest page size the tag listing API accepts
pub const MAX_RESOURCES_PER_PAGE: i32 = 100;

/// Walks the pages of a `GetResources` listing.
///
/// With `stop_on_duplicate_token` set (the default), a continuation token equal
/// to the one just sent ends the listing, so a misbehaving API cannot keep the
/// paginator looping forever.
pub struct GetResourcesPaginator<'a> {
    api: &'a dyn ResourceGroupsTaggingApi,
    input: GetResourcesInput,
    next_token: Option<String>,
    first_page: bool,
    stop_on_duplicate_token: bool,
}

impl<'a> GetResourcesPaginator<'a> {
    pub fn new(api: &'a dyn ResourceGroupsTaggingApi, input: GetResourcesInput) -> Self {
        let next_token = input.pagination_token.clone();
        Self {
            api,
            input,
            next_token,
            first_page: true,
            stop_on_duplicate_token: true,
        }
    }

    pub fn stop_on_duplicate_token(mut self, stop: bool) -> Self {
        self.stop_on_duplicate_token = stop;
        self
    }

    pub fn has_more_pages(&self) -> bool {
        self.first_page || self.next_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Fetch the next page
    ///
    /// Fails if called after [`Self::has_more_pages`] returned false.
    pub async fn next_page(&mut self) -> ClientResult<GetResourcesOutput> {
        if !self.has_more_pages() {
            return Err(ClientError::api("GetResources", "no more pages available"));
        }

        let mut input = self.input.clone();
        input.pagination_token = self.next_token.clone();

        let output = self.api.get_resources(&input).await?;
        trace!(
            items = output.resource_tag_mapping_list.len(),
            "received tag listing page"
        );

        let prev_token = self.next_token.take();
        self.first_page = false;
        self.next_token = output.pagination_token.clone();

        if self.stop_on_duplicate_token && prev_token.is_some() && prev_token == self.next_token {
            trace!("stopping on duplicate pagination token");
            self.next_token = None;
        }

        Ok(output)
    }
}
