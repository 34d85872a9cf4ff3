use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_acquisition_tables::Migration),
            Box::new(m20240301_000002_create_assets_table::Migration),
            Box::new(m20240301_000003_create_allocation_table::Migration),
            Box::new(m20240301_000004_create_asset_issues_table::Migration),
            Box::new(m20240301_000005_create_asset_log_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_acquisition_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_acquisition_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Acquisition::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Acquisition::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Acquisition::PoNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Acquisition::PoDate).date().not_null())
                        .col(
                            ColumnDef::new(Acquisition::Qty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Acquisition::VendorCode).string().null())
                        .col(ColumnDef::new(Acquisition::VendorName).string().null())
                        .col(
                            ColumnDef::new(Acquisition::PoValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Acquisition::SapId).integer().null())
                        .col(ColumnDef::new(Acquisition::Dept).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AcquisitionLineItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AcquisitionLineItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AcquisitionLineItems::PoNo).string().not_null())
                        .col(ColumnDef::new(AcquisitionLineItems::LiType).string().null())
                        .col(
                            ColumnDef::new(AcquisitionLineItems::MaterialCode)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AcquisitionLineItems::MaterialDescription)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(AcquisitionLineItems::Qty).integer().not_null())
                        .col(
                            ColumnDef::new(AcquisitionLineItems::PoValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(AcquisitionLineItems::AllocatedQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(AcquisitionLineItems::AvailableQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(AcquisitionLineItems::CreatedAssets)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(AcquisitionLineItems::IsTagged)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(AcquisitionLineItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_acquisition_line_items_po_no")
                                .from(AcquisitionLineItems::Table, AcquisitionLineItems::PoNo)
                                .to(Acquisition::Table, Acquisition::PoNo)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_acquisition_line_items_po_no")
                        .table(AcquisitionLineItems::Table)
                        .col(AcquisitionLineItems::PoNo)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AcquisitionLineItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Acquisition::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Acquisition {
        Table,
        Id,
        PoNo,
        PoDate,
        Qty,
        VendorCode,
        VendorName,
        PoValue,
        SapId,
        Dept,
    }

    #[derive(DeriveIden)]
    pub(super) enum AcquisitionLineItems {
        Table,
        Id,
        PoNo,
        LiType,
        MaterialCode,
        MaterialDescription,
        Qty,
        PoValue,
        AllocatedQty,
        AvailableQty,
        CreatedAssets,
        IsTagged,
        CreatedAt,
    }
}

mod m20240301_000002_create_assets_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_assets_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Assets::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Assets::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Assets::Tag).string().not_null().unique_key())
                        .col(ColumnDef::new(Assets::AssetType).string().null())
                        .col(ColumnDef::new(Assets::Description).string().not_null())
                        .col(ColumnDef::new(Assets::PoNo).string().null())
                        .col(ColumnDef::new(Assets::PoDate).date().null())
                        .col(ColumnDef::new(Assets::MaterialCode).string().null())
                        .col(
                            ColumnDef::new(Assets::Value)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Assets::Vendor).string().null())
                        .col(ColumnDef::new(Assets::AcquisitionLiId).integer().null())
                        .col(
                            ColumnDef::new(Assets::Status)
                                .string_len(32)
                                .not_null()
                                .default("Free"),
                        )
                        .col(ColumnDef::new(Assets::WarrantyUpto).date().null())
                        .col(ColumnDef::new(Assets::Remarks).string().null())
                        .col(
                            ColumnDef::new(Assets::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Assets::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assets_status")
                        .table(Assets::Table)
                        .col(Assets::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_assets_po_no")
                        .table(Assets::Table)
                        .col(Assets::PoNo)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Assets::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Assets {
        Table,
        Id,
        Tag,
        AssetType,
        Description,
        PoNo,
        PoDate,
        MaterialCode,
        Value,
        Vendor,
        AcquisitionLiId,
        Status,
        WarrantyUpto,
        Remarks,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_allocation_table {

    use super::m20240301_000002_create_assets_table::Assets;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_allocation_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Allocation::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Allocation::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Allocation::Tag).string().not_null())
                        .col(ColumnDef::new(Allocation::Description).string().null())
                        .col(ColumnDef::new(Allocation::Value).decimal().null())
                        .col(ColumnDef::new(Allocation::Status).string_len(32).not_null())
                        .col(ColumnDef::new(Allocation::SapId).integer().null())
                        .col(ColumnDef::new(Allocation::AllocatedTo).string().null())
                        .col(ColumnDef::new(Allocation::Designation).string().null())
                        .col(ColumnDef::new(Allocation::Division).string().null())
                        .col(ColumnDef::new(Allocation::Department).string().null())
                        .col(ColumnDef::new(Allocation::Building).string().null())
                        .col(ColumnDef::new(Allocation::Phone).string().null())
                        .col(
                            ColumnDef::new(Allocation::AllocatedOn)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Allocation::AllocatedBy).integer().null())
                        .col(
                            ColumnDef::new(Allocation::DeallocatedOn)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Allocation::DeallocatedBy).integer().null())
                        .col(
                            ColumnDef::new(Allocation::CycleCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Allocation::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Allocation::Reason).string().null())
                        .col(
                            ColumnDef::new(Allocation::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Allocation::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_allocation_tag")
                                .from(Allocation::Table, Allocation::Tag)
                                .to(Assets::Table, Assets::Tag)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            // latest-row lookups filter by tag and order by id
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_allocation_tag_id")
                        .table(Allocation::Table)
                        .col(Allocation::Tag)
                        .col(Allocation::Id)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Allocation::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Allocation {
        Table,
        Id,
        Tag,
        Description,
        Value,
        Status,
        SapId,
        AllocatedTo,
        Designation,
        Division,
        Department,
        Building,
        Phone,
        AllocatedOn,
        AllocatedBy,
        DeallocatedOn,
        DeallocatedBy,
        CycleCount,
        Active,
        Reason,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_asset_issues_table {

    use super::m20240301_000002_create_assets_table::Assets;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_asset_issues_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AssetIssues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AssetIssues::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AssetIssues::Tag).string().not_null())
                        .col(ColumnDef::new(AssetIssues::RaisedBy).integer().not_null())
                        .col(ColumnDef::new(AssetIssues::Category).string_len(32).not_null())
                        .col(
                            ColumnDef::new(AssetIssues::Priority)
                                .string_len(32)
                                .not_null()
                                .default("Medium"),
                        )
                        .col(ColumnDef::new(AssetIssues::Description).text().not_null())
                        .col(
                            ColumnDef::new(AssetIssues::Status)
                                .string_len(32)
                                .not_null()
                                .default("Open"),
                        )
                        .col(ColumnDef::new(AssetIssues::AssignedTo).integer().null())
                        .col(ColumnDef::new(AssetIssues::ResolutionNote).text().null())
                        .col(
                            ColumnDef::new(AssetIssues::ClosedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(AssetIssues::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(AssetIssues::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_issues_tag")
                                .from(AssetIssues::Table, AssetIssues::Tag)
                                .to(Assets::Table, Assets::Tag)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_issues_tag")
                        .table(AssetIssues::Table)
                        .col(AssetIssues::Tag)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_issues_status")
                        .table(AssetIssues::Table)
                        .col(AssetIssues::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_issues_assigned_to")
                        .table(AssetIssues::Table)
                        .col(AssetIssues::AssignedTo)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AssetIssues::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AssetIssues {
        Table,
        Id,
        Tag,
        RaisedBy,
        Category,
        Priority,
        Description,
        Status,
        AssignedTo,
        ResolutionNote,
        ClosedAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_asset_log_table {

    use super::m20240301_000002_create_assets_table::Assets;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_asset_log_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AssetLog::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AssetLog::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(AssetLog::AllocationId).integer().null())
                        .col(ColumnDef::new(AssetLog::Tag).string().not_null())
                        .col(ColumnDef::new(AssetLog::Event).string_len(40).not_null())
                        .col(ColumnDef::new(AssetLog::Details).text().null())
                        .col(ColumnDef::new(AssetLog::PerformedBy).integer().not_null())
                        .col(ColumnDef::new(AssetLog::PerformedByRole).string().null())
                        .col(
                            ColumnDef::new(AssetLog::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_asset_log_tag")
                                .from(AssetLog::Table, AssetLog::Tag)
                                .to(Assets::Table, Assets::Tag)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_asset_log_tag")
                        .table(AssetLog::Table)
                        .col(AssetLog::Tag)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AssetLog::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AssetLog {
        Table,
        Id,
        AllocationId,
        Tag,
        Event,
        Details,
        PerformedBy,
        PerformedByRole,
        CreatedAt,
    }
}
