use crate::{
    auth::{require_admin, AuthUser},
    entities::{category, product, product_addon, product_variant, variant_addon},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        catalog::{normalize_name, validate_variant_name, AddonInput, ProductInput, VariantInput},
        AddonOption, ProductConfiguration, VariantOption,
    },
};
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// A product with its variants and the add-ons offered for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub variants: Vec<VariantOption>,
    pub addons: Vec<AddonOption>,
}

impl ProductDetail {
    pub fn configuration(&self) -> ProductConfiguration {
        ProductConfiguration {
            product_id: self.product.id,
            name: self.product.name.clone(),
            base_price: self.product.base_price,
            is_available: self.product.is_available,
            variants: self.variants.clone(),
            addons: self.addons.clone(),
        }
    }
}

/// Counts of what a variant reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariantSyncOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Product catalog service for managing categories, products, variants and
/// the global add-on catalog.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        actor: Option<&AuthUser>,
        name: &str,
    ) -> Result<category::Model, ServiceError> {
        require_admin(actor)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name cannot be blank".to_string(),
            ));
        }

        let wanted = normalize_name(name);
        let existing = category::Entity::find().all(&*self.db).await?;
        if existing.iter().any(|c| normalize_name(&c.name) == wanted) {
            return Err(ServiceError::ValidationError(format!(
                "Category \"{}\" already exists",
                name
            )));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(model.id))
            .await;

        info!(category_id = %model.id, "Created category");
        Ok(model)
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Creates a product together with its variant set. Every variant is
    /// linked to every add-on in `input.addons`.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        actor: Option<&AuthUser>,
        input: ProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        require_admin(actor)?;
        input.validate_sets()?;

        let txn = self.db.begin().await?;

        if let Some(category_id) = input.category_id {
            ensure_category_exists(&txn, category_id).await?;
        }

        let product_id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description.clone()),
            base_price: Set(input.base_price),
            image_url: Set(input.image_url.clone()),
            category_id: Set(input.category_id),
            is_available: Set(input.is_available),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let addon_ids = resolve_addons(&txn, &input.addons).await?;
        let outcome = sync_variants(&txn, product_id, &input.variants, &addon_ids).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit product {}: {}", product_id, e);
            ServiceError::db_error(e)
        })?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!(
            product_id = %product_id,
            variants = outcome.inserted,
            addons = addon_ids.len(),
            "Created product"
        );
        self.get_product(product_id).await
    }

    /// Updates product attributes and reconciles the variant and add-on sets
    /// against the submitted form in one transaction.
    #[instrument(skip(self, input), fields(product_id = %product_id))]
    pub async fn update_product(
        &self,
        actor: Option<&AuthUser>,
        product_id: Uuid,
        input: ProductInput,
    ) -> Result<ProductDetail, ServiceError> {
        require_admin(actor)?;
        input.validate_sets()?;

        let txn = self.db.begin().await?;

        let current = product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        if let Some(category_id) = input.category_id {
            ensure_category_exists(&txn, category_id).await?;
        }

        let mut active: product::ActiveModel = current.into();
        active.name = Set(input.name.trim().to_string());
        active.description = Set(input.description.clone());
        active.base_price = Set(input.base_price);
        active.image_url = Set(input.image_url.clone());
        active.category_id = Set(input.category_id);
        active.is_available = Set(input.is_available);
        active.update(&txn).await?;

        let addon_ids = resolve_addons(&txn, &input.addons).await?;
        let outcome = sync_variants(&txn, product_id, &input.variants, &addon_ids).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit product {}: {}", product_id, e);
            ServiceError::db_error(e)
        })?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!(
            inserted = outcome.inserted,
            updated = outcome.updated,
            removed = outcome.removed,
            "Updated product"
        );
        self.get_product(product_id).await
    }

    /// Deletes a product with its variants and their add-on links. Global
    /// add-ons stay in the catalog.
    #[instrument(skip(self))]
    pub async fn delete_product(
        &self,
        actor: Option<&AuthUser>,
        product_id: Uuid,
    ) -> Result<(), ServiceError> {
        require_admin(actor)?;

        let txn = self.db.begin().await?;

        product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let variant_ids: Vec<Uuid> = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|v| v.id)
            .collect();

        if !variant_ids.is_empty() {
            variant_addon::Entity::delete_many()
                .filter(variant_addon::Column::VariantId.is_in(variant_ids.clone()))
                .exec(&txn)
                .await?;
            product_variant::Entity::delete_many()
                .filter(product_variant::Column::Id.is_in(variant_ids))
                .exec(&txn)
                .await?;
        }

        product::Entity::delete_by_id(product_id).exec(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!(product_id = %product_id, "Deleted product");
        Ok(())
    }

    /// Adds one variant to an existing product. The new variant offers the
    /// same add-ons as its siblings.
    #[instrument(skip(self, input), fields(product_id = %product_id, name = %input.name))]
    pub async fn add_variant(
        &self,
        actor: Option<&AuthUser>,
        product_id: Uuid,
        input: VariantInput,
    ) -> Result<VariantOption, ServiceError> {
        require_admin(actor)?;
        input.validate()?;

        let txn = self.db.begin().await?;

        product::Entity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let siblings = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .all(&txn)
            .await?;

        validate_variant_name(siblings.iter().map(|v| v.name.as_str()), &input.name, None)?;

        let sibling_ids: Vec<Uuid> = siblings.iter().map(|v| v.id).collect();
        let mut addon_ids: Vec<Uuid> = Vec::new();
        if !sibling_ids.is_empty() {
            for link in variant_addon::Entity::find()
                .filter(variant_addon::Column::VariantId.is_in(sibling_ids))
                .all(&txn)
                .await?
            {
                if !addon_ids.contains(&link.addon_id) {
                    addon_ids.push(link.addon_id);
                }
            }
        }

        let position = siblings.iter().map(|v| v.position + 1).max().unwrap_or(0);
        let variant = product_variant::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            name: Set(input.name.trim().to_string()),
            price_modifier: Set(input.price_modifier),
            position: Set(position),
            created_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        reconcile_links(&txn, &[variant.id], &addon_ids).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!(variant_id = %variant.id, "Added variant");
        Ok(VariantOption {
            id: variant.id,
            name: variant.name,
            price_modifier: variant.price_modifier,
            addon_ids,
        })
    }

    /// Returns the id of the catalog add-on named `input.name`, creating it
    /// when no add-on with that name exists yet. The price of an existing
    /// add-on is left as is.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn resolve_or_create_addon(
        &self,
        actor: Option<&AuthUser>,
        input: &AddonInput,
    ) -> Result<Uuid, ServiceError> {
        require_admin(actor)?;
        input.validate()?;
        resolve_or_create_addon(&*self.db, input).await
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductDetail, ServiceError> {
        let product = product::Entity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let mut details = load_details(&*self.db, vec![product]).await?;
        details
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Menu in name order. Unavailable products are hidden unless asked for.
    #[instrument(skip(self))]
    pub async fn list_menu(
        &self,
        include_unavailable: bool,
    ) -> Result<Vec<ProductDetail>, ServiceError> {
        let mut query = product::Entity::find().order_by_asc(product::Column::Name);
        if !include_unavailable {
            query = query.filter(product::Column::IsAvailable.eq(true));
        }
        let products = query.all(&*self.db).await?;
        Ok(load_details(&*self.db, products).await?)
    }

    pub async fn product_configuration(
        &self,
        product_id: Uuid,
    ) -> Result<ProductConfiguration, ServiceError> {
        Ok(self.get_product(product_id).await?.configuration())
    }
}

async fn ensure_category_exists<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
) -> Result<(), ServiceError> {
    category::Entity::find_by_id(category_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", category_id)))
}

/// Insert-if-absent keyed on the normalized name, then read back. Concurrent
/// callers introducing the same name converge on a single row.
pub(crate) async fn resolve_or_create_addon<C: ConnectionTrait>(
    conn: &C,
    input: &AddonInput,
) -> Result<Uuid, ServiceError> {
    let normalized = normalize_name(&input.name);

    let candidate = product_addon::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name.trim().to_string()),
        normalized_name: Set(normalized.clone()),
        price: Set(input.price),
        created_at: Set(Utc::now()),
    };

    let inserted = product_addon::Entity::insert(candidate)
        .on_conflict(
            OnConflict::column(product_addon::Column::NormalizedName)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await;

    match inserted {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => {
            error!("Failed to upsert add-on '{}': {}", normalized, e);
            return Err(ServiceError::db_error(e));
        }
    }

    product_addon::Entity::find()
        .filter(product_addon::Column::NormalizedName.eq(normalized.as_str()))
        .one(conn)
        .await?
        .map(|addon| addon.id)
        .ok_or_else(|| {
            ServiceError::InternalError(format!("Add-on '{}' missing after upsert", normalized))
        })
}

async fn resolve_addons<C: ConnectionTrait>(
    conn: &C,
    addons: &[AddonInput],
) -> Result<Vec<Uuid>, ServiceError> {
    let mut ids = Vec::with_capacity(addons.len());
    for addon in addons {
        let id = resolve_or_create_addon(conn, addon).await?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Reconciles the stored variants of a product with `incoming`, matching by
/// normalized name. Matched variants keep their ids; unmatched stored
/// variants are removed with their links; new names are inserted. Afterwards
/// every variant of the product is linked to exactly `addon_ids`.
pub(crate) async fn sync_variants<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    incoming: &[VariantInput],
    addon_ids: &[Uuid],
) -> Result<VariantSyncOutcome, ServiceError> {
    let mut outcome = VariantSyncOutcome::default();

    let mut stored: HashMap<String, product_variant::Model> = product_variant::Entity::find()
        .filter(product_variant::Column::ProductId.eq(product_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|v| (normalize_name(&v.name), v))
        .collect();

    let mut kept = Vec::with_capacity(incoming.len());
    for (idx, input) in incoming.iter().enumerate() {
        let position = idx as i32;
        let name = input.name.trim().to_string();

        match stored.remove(&normalize_name(&name)) {
            Some(current) => {
                kept.push(current.id);
                if current.name != name
                    || current.price_modifier != input.price_modifier
                    || current.position != position
                {
                    let mut active: product_variant::ActiveModel = current.into();
                    active.name = Set(name);
                    active.price_modifier = Set(input.price_modifier);
                    active.position = Set(position);
                    active.update(conn).await?;
                    outcome.updated += 1;
                }
            }
            None => {
                let id = Uuid::new_v4();
                product_variant::ActiveModel {
                    id: Set(id),
                    product_id: Set(product_id),
                    name: Set(name),
                    price_modifier: Set(input.price_modifier),
                    position: Set(position),
                    created_at: Set(Utc::now()),
                }
                .insert(conn)
                .await?;
                kept.push(id);
                outcome.inserted += 1;
            }
        }
    }

    let removed: Vec<Uuid> = stored.into_values().map(|v| v.id).collect();
    if !removed.is_empty() {
        variant_addon::Entity::delete_many()
            .filter(variant_addon::Column::VariantId.is_in(removed.clone()))
            .exec(conn)
            .await?;
        product_variant::Entity::delete_many()
            .filter(product_variant::Column::Id.is_in(removed.clone()))
            .exec(conn)
            .await?;
        outcome.removed = removed.len();
    }

    reconcile_links(conn, &kept, addon_ids).await?;
    Ok(outcome)
}

/// Makes the link set of each variant in `variant_ids` equal to `addon_ids`.
async fn reconcile_links<C: ConnectionTrait>(
    conn: &C,
    variant_ids: &[Uuid],
    addon_ids: &[Uuid],
) -> Result<(), ServiceError> {
    if variant_ids.is_empty() {
        return Ok(());
    }

    let current: HashSet<(Uuid, Uuid)> = variant_addon::Entity::find()
        .filter(variant_addon::Column::VariantId.is_in(variant_ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|link| (link.variant_id, link.addon_id))
        .collect();

    let desired: HashSet<(Uuid, Uuid)> = variant_ids
        .iter()
        .flat_map(|v| addon_ids.iter().map(move |a| (*v, *a)))
        .collect();

    for (variant_id, addon_id) in current.difference(&desired) {
        variant_addon::Entity::delete_many()
            .filter(variant_addon::Column::VariantId.eq(*variant_id))
            .filter(variant_addon::Column::AddonId.eq(*addon_id))
            .exec(conn)
            .await?;
    }

    let missing: Vec<variant_addon::ActiveModel> = desired
        .difference(&current)
        .map(|(variant_id, addon_id)| variant_addon::ActiveModel {
            variant_id: Set(*variant_id),
            addon_id: Set(*addon_id),
        })
        .collect();

    if !missing.is_empty() {
        variant_addon::Entity::insert_many(missing)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}

/// Attaches variants and offered add-ons to each product, preserving the
/// order of `products`.
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    products: Vec<product::Model>,
) -> Result<Vec<ProductDetail>, DbErr> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let variants = product_variant::Entity::find()
        .filter(product_variant::Column::ProductId.is_in(product_ids))
        .order_by_asc(product_variant::Column::Position)
        .all(conn)
        .await?;

    let variant_ids: Vec<Uuid> = variants.iter().map(|v| v.id).collect();
    let links = if variant_ids.is_empty() {
        Vec::new()
    } else {
        variant_addon::Entity::find()
            .filter(variant_addon::Column::VariantId.is_in(variant_ids))
            .all(conn)
            .await?
    };

    let addon_ids: Vec<Uuid> = links
        .iter()
        .map(|l| l.addon_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let addons = if addon_ids.is_empty() {
        Vec::new()
    } else {
        product_addon::Entity::find()
            .filter(product_addon::Column::Id.is_in(addon_ids))
            .order_by_asc(product_addon::Column::Name)
            .all(conn)
            .await?
    };
    let addon_rank: HashMap<Uuid, usize> = addons
        .iter()
        .enumerate()
        .map(|(rank, a)| (a.id, rank))
        .collect();

    let mut links_by_variant: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for link in &links {
        links_by_variant
            .entry(link.variant_id)
            .or_default()
            .push(link.addon_id);
    }

    let details = products
        .into_iter()
        .map(|product| {
            let variants: Vec<VariantOption> = variants
                .iter()
                .filter(|v| v.product_id == product.id)
                .map(|v| {
                    let mut addon_ids = links_by_variant.get(&v.id).cloned().unwrap_or_default();
                    addon_ids.sort_by_key(|id| addon_rank.get(id).copied().unwrap_or(usize::MAX));
                    VariantOption {
                        id: v.id,
                        name: v.name.clone(),
                        price_modifier: v.price_modifier,
                        addon_ids,
                    }
                })
                .collect();

            let offered: HashSet<Uuid> = variants
                .iter()
                .flat_map(|v| v.addon_ids.iter().copied())
                .collect();
            let addons = addons
                .iter()
                .filter(|a| offered.contains(&a.id))
                .map(|a| AddonOption {
                    id: a.id,
                    name: a.name.clone(),
                    price: a.price,
                })
                .collect();

            ProductDetail {
                product,
                variants,
                addons,
            }
        })
        .collect();

    Ok(details)
}
