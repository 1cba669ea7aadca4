use crate::{exec, plan::Plan, store::ConnectionRef};

use geostore_core::{err, Connection, Error, Feature, FeatureId, Result};
use geostore_sql::Serializer;
use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};
use tokio_stream::{Stream, StreamExt};

/// Features of one query, pulled lazily from the store.
///
/// The stream owns the connection it reads from and gives it back when it
/// finishes or is dropped. It cannot be restarted.
pub struct FeatureStream {
    inner: Pin<Box<dyn Stream<Item = Result<Feature>> + Send + 'static>>,
}

impl FeatureStream {
    pub(crate) fn new(connection: ConnectionRef, serializer: Serializer, plan: Plan) -> FeatureStream {
        let type_name = plan.type_name().to_string();
        let features = read(connection, serializer, plan)
            .map(move |res| res.map_err(|err| err.context(err!("query `{type_name}`"))));

        FeatureStream {
            inner: Box::pin(features),
        }
    }

    /// Returns the next feature in the stream.
    pub async fn next(&mut self) -> Option<Result<Feature>> {
        StreamExt::next(self).await
    }

    /// Collects all remaining features.
    pub async fn collect<B>(mut self) -> Result<B>
    where
        B: Extend<Feature> + Default,
    {
        let mut ret = B::default();

        while let Some(res) = self.next().await {
            ret.extend(Some(res?));
        }

        Ok(ret)
    }

    /// Collects the identifiers of the remaining features.
    pub async fn ids(mut self) -> Result<Vec<FeatureId>> {
        let mut ids = vec![];
        while let Some(res) = self.next().await {
            ids.extend(res?.id);
        }
        Ok(ids)
    }

    /// Counts the remaining features.
    pub async fn count(mut self) -> Result<u64> {
        let mut count = 0;
        while let Some(res) = self.next().await {
            res?;
            count += 1;
        }
        Ok(count)
    }
}

fn read(
    mut connection: ConnectionRef,
    serializer: Serializer,
    plan: Plan,
) -> impl Stream<Item = Result<Feature>> + Send + 'static {
    async_stream::try_stream! {
        let mut rows = exec::query(
            connection.get(),
            serializer,
            plan.select.clone(),
            &plan.ret,
        )
        .await?;

        let mut window = Window::default();

        while let Some(row) = rows.next().await {
            let feature = plan.decode(row.map_err(Error::read)?).map_err(Error::read)?;

            match window.admit(&plan, &feature) {
                Admit::Yield => yield plan.finish(feature),
                Admit::Skip => continue,
                Admit::Stop => break,
            }
        }
    }
}

/// Reads every feature of `plan` on a borrowed connection.
pub(crate) async fn for_each(
    connection: &mut dyn Connection,
    serializer: Serializer,
    plan: &Plan,
    mut f: impl FnMut(Feature) + Send,
) -> Result<()> {
    let mut rows = exec::query(connection, serializer, plan.select.clone(), &plan.ret).await?;
    let mut window = Window::default();

    while let Some(row) = rows.next().await {
        let feature = plan.decode(row.map_err(Error::read)?).map_err(Error::read)?;

        match window.admit(plan, &feature) {
            Admit::Yield => f(plan.finish(feature)),
            Admit::Skip => continue,
            Admit::Stop => break,
        }
    }

    Ok(())
}

/// Applies the residual filter and the client side page to decoded rows.
#[derive(Debug, Default)]
struct Window {
    skipped: u64,
    returned: u64,
}

enum Admit {
    Yield,
    Skip,
    Stop,
}

impl Window {
    fn admit(&mut self, plan: &Plan, feature: &Feature) -> Admit {
        if plan.max.is_some_and(|max| self.returned >= max) {
            return Admit::Stop;
        }

        if !plan.residual.matches(feature) {
            return Admit::Skip;
        }

        if self.skipped < plan.skip {
            self.skipped += 1;
            return Admit::Skip;
        }

        self.returned += 1;
        Admit::Yield
    }
}

impl Stream for FeatureStream {
    type Item = Result<Feature>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl fmt::Debug for FeatureStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureStream").finish_non_exhaustive()
    }
}
